use std::{sync::Arc, time::Duration};

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
    Method,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::{
    config::NowPaymentsConfig,
    data_objects::{GatewayPayment, NewGatewayPayment, PaymentRequest},
    signature::verify_signature,
    NowPaymentsApiError,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct NowPaymentsApi {
    config: NowPaymentsConfig,
    client: Arc<Client>,
}

impl NowPaymentsApi {
    pub fn new(config: NowPaymentsConfig) -> Result<Self, NowPaymentsApiError> {
        let mut headers = HeaderMap::with_capacity(2);
        let val = HeaderValue::from_str(config.api_key.reveal().as_str())
            .map_err(|e| NowPaymentsApiError::Initialization(e.to_string()))?;
        headers.insert("x-api-key", val);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| NowPaymentsApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn config(&self) -> &NowPaymentsConfig {
        &self.config
    }

    pub async fn rest_query<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, &str)],
        body: Option<B>,
    ) -> Result<T, NowPaymentsApiError> {
        let url = self.url(path);
        trace!("🌐️ Sending REST query: {method} {url}");
        let mut req = self.client.request(method, url);
        if !params.is_empty() {
            req = req.query(params);
        }
        if let Some(body) = body {
            req = req.json(&body);
        }
        let response = req.send().await.map_err(|e| NowPaymentsApiError::RestRequestError(e.to_string()))?;
        if response.status().is_success() {
            trace!("🌐️ REST query successful. {}", response.status());
            response.json::<T>().await.map_err(|e| NowPaymentsApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message =
                response.text().await.map_err(|e| NowPaymentsApiError::RestResponseError(e.to_string()))?;
            Err(NowPaymentsApiError::QueryError { status, message })
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url.trim_end_matches('/'))
    }

    /// Creates a payment with the gateway. The returned payment's `payment_id` is the gateway's transaction id.
    pub async fn create_payment(&self, request: &PaymentRequest) -> Result<GatewayPayment, NowPaymentsApiError> {
        let body = NewGatewayPayment::new(request, &self.config)?;
        debug!("🌐️ Creating gateway payment for {} ({} {})", request.payment_id, request.amount, request.currency);
        let result = self.rest_query::<Value, _>(Method::POST, "/payment", &[], Some(body)).await.map_err(|e| {
            error!("🌐️ Gateway could not create payment {}. {e}", request.payment_id);
            e
        })?;
        let payment = GatewayPayment::from_json(result)?;
        info!("🌐️ Gateway created payment {} for {}", payment.payment_id, request.payment_id);
        Ok(payment)
    }

    /// Fetches the current state of a payment from the gateway.
    pub async fn payment_status(&self, transaction_id: &str) -> Result<GatewayPayment, NowPaymentsApiError> {
        let path = format!("/payment/{transaction_id}");
        debug!("🌐️ Fetching gateway status for payment {transaction_id}");
        let result = self.rest_query::<Value, ()>(Method::GET, &path, &[], None).await.map_err(|e| {
            error!("🌐️ Could not fetch status for gateway payment {transaction_id}. {e}");
            e
        })?;
        let payment = GatewayPayment::from_json(result)?;
        debug!("🌐️ Gateway payment {transaction_id} is {}", payment.payment_status);
        Ok(payment)
    }

    /// Checks the `x-nowpayments-sig` signature of a raw IPN body.
    ///
    /// When no IPN secret is configured, production deployments reject every notification, while sandbox deployments
    /// accept them all.
    pub fn verify_ipn_signature(&self, raw_body: &[u8], signature: &str) -> bool {
        if self.config.ipn_secret.is_empty() {
            if self.config.production {
                error!("🔐️ No IPN secret is configured. Rejecting IPN notification.");
                return false;
            }
            warn!("🔐️ No IPN secret is configured. Skipping IPN signature verification.");
            return true;
        }
        let value = match serde_json::from_slice::<Value>(raw_body) {
            Ok(v) => v,
            Err(e) => {
                warn!("🔐️ IPN body is not valid JSON, so its signature cannot be checked. {e}");
                return false;
            },
        };
        let valid = verify_signature(self.config.ipn_secret.reveal(), &value, signature);
        if valid {
            trace!("🔐️ IPN signature check ✅️");
        } else {
            warn!("🔐️ IPN signature mismatch.");
        }
        valid
    }
}
