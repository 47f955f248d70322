use anyhow::Context;
use regex::Regex;
use serde::{Deserialize, de::DeserializeOwned};

pub const DEFAULT_BASE_URL: &str = "https://academia.srmist.edu.in";
/// Used when the welcome page can't be fetched or carries no day order.
pub const DEFAULT_DAY_ORDER: u32 = 4;

const ACCOUNTS_PATH: &str = "/accounts/p/40-10002227248/signin/v2";
const SIGNIN_REFERER_PATH: &str = "/accounts/p/10002227248/signin";
const SERVICE_PATH: &str = "/portal/academia-academic-services/redirectFromLogin";
const PAGES_PATH: &str = "/srm_university/academia-academic-services/page";

/// The env config env vars needed to sign in to the portal.
#[derive(Debug, Deserialize)]
pub struct PortalEnv {
    pub academia_email: String,
    pub academia_password: String,
    pub academia_base_url: Option<String>,
    /// Value of the portal's `iamcsr` cookie, if a CSRF token is required.
    pub academia_csrf_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct PortalConfig {
    base_url: String,
    pub csrf_token: Option<String>,
}

impl PortalConfig {
    pub fn new(base_url: Option<String>, csrf_token: Option<String>) -> Self {
        let base_url = base_url
            .map(|url| url.trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self {
            base_url,
            csrf_token: csrf_token.filter(|token| !token.is_empty()),
        }
    }

    /// Reads `.env`/environment and splits it into portal config and credentials.
    pub fn from_env() -> anyhow::Result<(Self, Credentials)> {
        let env = PortalEnv::load_from_env()?;
        let config = Self::new(env.academia_base_url, env.academia_csrf_token);
        let credentials = Credentials {
            email: env.academia_email,
            password: env.academia_password,
        };
        Ok((config, credentials))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn lookup_url(&self, email: &str) -> String {
        format!("{}{ACCOUNTS_PATH}/lookup/{email}", self.base_url)
    }

    pub fn password_url(&self, identifier: &str) -> String {
        format!("{}{ACCOUNTS_PATH}/primary/{identifier}/password", self.base_url)
    }

    pub fn signin_referer(&self) -> String {
        format!("{}{SIGNIN_REFERER_PATH}", self.base_url)
    }

    pub fn service_url(&self) -> String {
        format!("{}{SERVICE_PATH}", self.base_url)
    }

    pub fn attendance_page_url(&self) -> String {
        self.page_url("My_Attendance")
    }

    pub fn timetable_page_url(&self) -> String {
        self.page_url("My_Time_Table_2023_24")
    }

    pub fn welcome_page_url(&self) -> String {
        self.page_url("WELCOME")
    }

    fn page_url(&self, page: &str) -> String {
        format!("{}{PAGES_PATH}/{page}", self.base_url)
    }
}

pub struct DayOrderExtractor {
    // Matches the still-escaped welcome page text, e.g. `\x3EDay\x20Order\x3A1\x26nbsp\x3B`.
    day_order_regex: Regex,
}

impl DayOrderExtractor {
    pub fn new() -> anyhow::Result<Self> {
        let day_order_regex = Regex::new(r"Day\\x20Order\\x3A(\d+)")?;
        Ok(Self { day_order_regex })
    }

    pub fn extract_day_order(&self, raw_page: &str) -> Option<u32> {
        let caps = self.day_order_regex.captures(raw_page)?;
        caps.get(1)?.as_str().parse().ok()
    }
}

// Extension trait.
pub trait LoadFromEnv: DeserializeOwned {
    fn load_from_env() -> anyhow::Result<Self> {
        // Don't throw an error if .env file doesn't exist.
        let _ = dotenv::dotenv();
        let config =
            envy::from_env::<Self>().context("failed to load env variables into config struct")?;
        Ok(config)
    }
}

impl<T: DeserializeOwned> LoadFromEnv for T {}
