use {
    reqwest::Client,
    serde::Deserialize,
    tracing::{debug, info},
};

use switchboard_channels::{Error, Result};

const PROVIDER: &str = "whatsapp";

/// Access token returned by the OAuth code exchange.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    /// Seconds until expiry, when Meta reports one.
    #[serde(default)]
    pub expires_in: Option<i64>,
}

/// A WhatsApp Business Account owned by the authorized user.
#[derive(Debug, Clone, Deserialize)]
pub struct BusinessAccount {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// A phone number registered under a business account.
#[derive(Debug, Clone, Deserialize)]
pub struct PhoneNumber {
    pub id: String,
    pub display_phone_number: String,
    #[serde(default)]
    pub verified_name: Option<String>,
}

/// The `/me` identity for an access token.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphUser {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: serde::Deserialize<'de>"))]
struct DataEnvelope<T> {
    #[serde(default)]
    data: Vec<T>,
}

async fn read_error_body(resp: reqwest::Response) -> String {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    format!("HTTP {status}: {body}")
}

/// Exchange an OAuth authorization code for an access token.
pub async fn exchange_code(
    client: &Client,
    base_url: &str,
    app_id: &str,
    app_secret: &str,
    redirect_uri: &str,
    code: &str,
) -> Result<TokenResponse> {
    debug!("exchanging oauth code for access token");
    let resp = client
        .post(format!("{base_url}/oauth/access_token"))
        .form(&[
            ("client_id", app_id),
            ("client_secret", app_secret),
            ("redirect_uri", redirect_uri),
            ("code", code),
        ])
        .send()
        .await
        .map_err(|e| Error::provider(PROVIDER, "exchangeCode", e))?;

    if !resp.status().is_success() {
        return Err(Error::provider(PROVIDER, "exchangeCode", read_error_body(resp).await));
    }

    resp.json()
        .await
        .map_err(|e| Error::provider(PROVIDER, "exchangeCode", e))
}

/// Fetch the identity the token belongs to.
pub async fn fetch_me(client: &Client, base_url: &str, access_token: &str) -> Result<GraphUser> {
    let resp = client
        .get(format!("{base_url}/me"))
        .query(&[("access_token", access_token)])
        .send()
        .await
        .map_err(|e| Error::provider(PROVIDER, "fetchMe", e))?;

    if !resp.status().is_success() {
        return Err(Error::provider(PROVIDER, "fetchMe", read_error_body(resp).await));
    }

    resp.json()
        .await
        .map_err(|e| Error::provider(PROVIDER, "fetchMe", e))
}

/// Fetch the WhatsApp Business Accounts owned by the token's user.
pub async fn fetch_business_accounts(
    client: &Client,
    base_url: &str,
    access_token: &str,
) -> Result<Vec<BusinessAccount>> {
    let resp = client
        .get(format!("{base_url}/me/owned_whatsapp_business_accounts"))
        .query(&[("access_token", access_token)])
        .send()
        .await
        .map_err(|e| Error::provider(PROVIDER, "fetchBusinessAccounts", e))?;

    if !resp.status().is_success() {
        return Err(Error::provider(
            PROVIDER,
            "fetchBusinessAccounts",
            read_error_body(resp).await,
        ));
    }

    let envelope: DataEnvelope<BusinessAccount> = resp
        .json()
        .await
        .map_err(|e| Error::provider(PROVIDER, "fetchBusinessAccounts", e))?;
    info!(accounts = envelope.data.len(), "fetched whatsapp business accounts");
    Ok(envelope.data)
}

/// Fetch the phone numbers registered under a business account.
pub async fn fetch_phone_numbers(
    client: &Client,
    base_url: &str,
    access_token: &str,
    waba_id: &str,
) -> Result<Vec<PhoneNumber>> {
    let resp = client
        .get(format!("{base_url}/{waba_id}/phone_numbers"))
        .query(&[("access_token", access_token)])
        .send()
        .await
        .map_err(|e| Error::provider(PROVIDER, "fetchPhoneNumbers", e))?;

    if !resp.status().is_success() {
        return Err(Error::provider(
            PROVIDER,
            "fetchPhoneNumbers",
            read_error_body(resp).await,
        ));
    }

    let envelope: DataEnvelope<PhoneNumber> = resp
        .json()
        .await
        .map_err(|e| Error::provider(PROVIDER, "fetchPhoneNumbers", e))?;
    Ok(envelope.data)
}
