//! `users.info` over plain HTTP.
//!
//! Presence comes from `profile.huddle_state` and names from the profile's
//! `first_name`/`last_name`, which the Slack client's user model does not
//! carry, so this one read method decodes the raw response itself.

use std::time::Duration;

use {
    rollcall_config::SlackConfig,
    secrecy::{ExposeSecret, Secret},
    serde::Deserialize,
    serde_json::Value,
    tracing::{debug, warn},
};

use crate::{
    Error, Result,
    api::{record_call, record_error},
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const METHOD: &str = "users.info";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SlackProfile {
    pub display_name: String,
    pub last_name: String,
    pub first_name: String,
    pub huddle_state: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlackUser {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub profile: SlackProfile,
}

#[derive(Deserialize)]
struct UserInfo {
    user: SlackUser,
}

pub struct ProfileApi {
    http: reqwest::Client,
    base_url: String,
    bot_token: Secret<String>,
}

impl ProfileApi {
    pub fn new(config: &SlackConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("rollcall/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            bot_token: config.bot_token.clone(),
        })
    }

    pub async fn users_info(&self, user: &str) -> Result<SlackUser> {
        record_call(METHOD);
        let resp = self
            .http
            .post(format!("{}/{METHOD}", self.base_url))
            .bearer_auth(self.bot_token.expose_secret())
            .form(&[("user", user)])
            .send()
            .await
            .inspect_err(|_| record_error(METHOD))?;

        let status = resp.status();
        if !status.is_success() {
            record_error(METHOD);
            warn!(method = METHOD, status = %status, "slack api returned error status");
            return Err(Error::Status {
                method: METHOD,
                status,
            });
        }

        let body: Value = resp.json().await.inspect_err(|_| record_error(METHOD))?;
        if body.get("ok").and_then(Value::as_bool) != Some(true) {
            record_error(METHOD);
            let code = body
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown_error");
            debug!(method = METHOD, code, "slack api call rejected");
            return Err(Error::api(METHOD, code));
        }
        let info: UserInfo = serde_json::from_value(body)?;
        Ok(info.user)
    }
}
