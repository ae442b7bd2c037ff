// Authentication module
// Discovers the server's auth mechanism and manages the token lifecycle

mod clock;
mod discovery;
mod manager;
mod refresh;
mod source;
mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use discovery::{discovery_url, ADMIN_SETTINGS_PATH};
pub use manager::{AuthManager, AuthManagerBuilder, DEFAULT_AUTH_TIMEOUT, DEFAULT_EXPIRY_MARGIN_SECS};
pub use source::{StaticToken, TokenSource};
pub use types::{
    AuthConfig, Credentials, GrantType, IdentityProvider, Mechanism, RefreshPolicy,
    LOCAL_SENTINEL_TOKEN,
};
