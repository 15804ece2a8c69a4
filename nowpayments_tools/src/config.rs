use cpg_common::{parse_boolean_flag, Secret};
use log::*;

pub const PRODUCTION_BASE_URL: &str = "https://api.nowpayments.io/v1";
pub const SANDBOX_BASE_URL: &str = "https://api-sandbox.nowpayments.io/v1";
const DEFAULT_PAY_CURRENCY: &str = "BTC";
const DEFAULT_SITE_URL: &str = "http://localhost:8360";

#[derive(Debug, Clone)]
pub struct NowPaymentsConfig {
    pub api_key: Secret<String>,
    pub ipn_secret: Secret<String>,
    pub base_url: String,
    /// Public URL of this site. IPN callbacks and the success/cancel redirects are built from it.
    pub site_url: String,
    /// The cryptocurrency the customer is asked to pay in.
    pub pay_currency: String,
    pub production: bool,
}

impl Default for NowPaymentsConfig {
    fn default() -> Self {
        Self {
            api_key: Secret::default(),
            ipn_secret: Secret::default(),
            base_url: SANDBOX_BASE_URL.to_string(),
            site_url: DEFAULT_SITE_URL.to_string(),
            pay_currency: DEFAULT_PAY_CURRENCY.to_string(),
            production: false,
        }
    }
}

impl NowPaymentsConfig {
    pub fn new_from_env_or_default() -> Self {
        let production = parse_boolean_flag(std::env::var("NOWPAYMENTS_PRODUCTION").ok(), false);
        let api_key = Secret::new(std::env::var("NOWPAYMENTS_API_KEY").unwrap_or_else(|_| {
            warn!("🪛️ NOWPAYMENTS_API_KEY not set. Requests to the gateway will be rejected.");
            String::default()
        }));
        let ipn_secret = Secret::new(std::env::var("NOWPAYMENTS_IPN_SECRET").unwrap_or_else(|_| {
            if production {
                error!("🪛️ NOWPAYMENTS_IPN_SECRET not set in production. ALL IPN notifications will be rejected.");
            } else {
                warn!("🪛️ NOWPAYMENTS_IPN_SECRET not set. IPN signatures will NOT be checked.");
            }
            String::default()
        }));
        let base_url = std::env::var("NOWPAYMENTS_BASE_URL").unwrap_or_else(|_| {
            let url = if production { PRODUCTION_BASE_URL } else { SANDBOX_BASE_URL };
            info!("🪛️ NOWPAYMENTS_BASE_URL not set. Using {url}");
            url.to_string()
        });
        let pay_currency = std::env::var("NOWPAYMENTS_PAY_CURRENCY").unwrap_or_else(|_| {
            info!("🪛️ NOWPAYMENTS_PAY_CURRENCY not set. Using {DEFAULT_PAY_CURRENCY}");
            DEFAULT_PAY_CURRENCY.to_string()
        });
        let site_url = std::env::var("CPG_SITE_URL").unwrap_or_else(|_| {
            warn!("🪛️ CPG_SITE_URL not set. Using {DEFAULT_SITE_URL}, which the gateway cannot reach.");
            DEFAULT_SITE_URL.to_string()
        });
        Self { api_key, ipn_secret, base_url, site_url, pay_currency, production }
    }

    pub fn ipn_callback_url(&self) -> String {
        format!("{}/api/payments/ipn", self.site_url.trim_end_matches('/'))
    }

    pub fn success_url(&self, payment_id: &str) -> String {
        format!("{}/dashboard/payment/{payment_id}/success", self.site_url.trim_end_matches('/'))
    }

    pub fn cancel_url(&self, payment_id: &str) -> String {
        format!("{}/dashboard/payment/{payment_id}/cancel", self.site_url.trim_end_matches('/'))
    }
}
