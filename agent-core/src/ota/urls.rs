const RAW_HOST: &str = "raw.githubusercontent.com";

/// Rewrite a human-facing GitHub repository URL to its raw-content host.
///
/// Only the host is rewritten, so repository paths that happen to contain
/// "github" survive. URLs already on the raw host are returned unchanged.
pub fn normalize_repo_url(url: &str) -> String {
    let normalized = if url.contains("www.github.com") {
        url.replacen("www.github.com", RAW_HOST, 1)
    } else if url.contains("github.com") {
        url.replacen("github.com", RAW_HOST, 1)
    } else {
        url.to_string()
    };

    if normalized != url {
        log::info!("Updating {} to {}", url, normalized);
    }
    normalized
}

/// Remote locations derived once from the configured repository base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoUrls {
    pub base: String,
    pub version_url: String,
    pub firmware_url: String,
}

impl RepoUrls {
    pub fn new(repo_url: &str, firmware_filename: &str) -> Self {
        let mut base = normalize_repo_url(repo_url);
        if !base.ends_with('/') {
            base.push('/');
        }

        let version_url = format!("{}main/version.json", base);
        let firmware_url = format!("{}main/{}", base, firmware_filename);
        log::info!("version url is: {}", version_url);

        Self {
            base,
            version_url,
            firmware_url,
        }
    }
}
