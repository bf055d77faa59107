use agent_core::network::WifiLink;
use anyhow::Result;
use esp_idf_hal::modem::Modem;
use esp_idf_svc::{
    eventloop::EspSystemEventLoop,
    nvs::EspDefaultNvsPartition,
    sys::EspError,
    wifi::{AuthMethod, ClientConfiguration, Configuration, EspWifi},
};

/// Station-mode WiFi driven by the core's bounded connect loop.
pub struct EspWifiLink {
    wifi: EspWifi<'static>,
}

impl EspWifiLink {
    pub fn new(
        modem: Modem,
        sys_loop: EspSystemEventLoop,
        nvs: EspDefaultNvsPartition,
    ) -> Result<Self> {
        let wifi = EspWifi::new(modem, sys_loop, Some(nvs))?;
        log::info!("WiFi driver initialized");
        Ok(Self { wifi })
    }

    pub fn get_mac(&self) -> String {
        self.wifi
            .sta_netif()
            .get_mac()
            .ok()
            .map(|mac| {
                format!(
                    "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
                    mac[0], mac[1], mac[2], mac[3], mac[4], mac[5]
                )
            })
            .unwrap_or_else(|| "Unknown".to_string())
    }
}

impl WifiLink for EspWifiLink {
    type Error = EspError;

    fn is_active(&self) -> bool {
        self.wifi.is_started().unwrap_or(false)
    }

    fn activate(&mut self) -> Result<(), EspError> {
        log::info!("Starting WiFi...");
        self.wifi.start()
    }

    fn connect(&mut self, ssid: &str, password: &str) -> Result<(), EspError> {
        let auth_method = if password.is_empty() {
            log::warn!("WiFi password is empty, using open network");
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };

        let cfg = Configuration::Client(ClientConfiguration {
            ssid: ssid.try_into().unwrap_or_else(|_| {
                log::error!("SSID '{}' is too long, truncating", ssid);
                ssid.chars().take(32).collect::<String>().as_str().try_into().unwrap_or_default()
            }),
            password: password.try_into().unwrap_or_else(|_| {
                log::error!("WiFi password is too long");
                Default::default()
            }),
            auth_method,
            ..Default::default()
        });

        self.wifi.set_configuration(&cfg)?;
        // Non-blocking; association is polled through is_connected
        self.wifi.connect()
    }

    fn is_connected(&self) -> bool {
        // Up means associated and DHCP done
        self.wifi.is_up().unwrap_or(false)
    }

    fn ip_address(&self) -> Option<String> {
        self.wifi
            .sta_netif()
            .get_ip_info()
            .ok()
            .map(|ip_info| format!("{}", ip_info.ip))
    }
}
