//! Engine for Steam's configuration store: text and binary KeyValues trees,
//! path lookups, account id conversions and the compatibility tool mapping.

pub mod app_manifest;
pub mod compat_tool;
pub mod config_tree;
pub mod core_api;
pub mod identity;
pub mod layout;
pub mod local_config;
pub mod login_users;
pub mod reader;
pub mod vdf;

pub use app_manifest::AppManifest;
pub use compat_tool::CompatToolMapping;
pub use config_tree::ConfigTree;
pub use identity::UserIdentity;
pub use local_config::LocalConfig;
pub use login_users::KnownUsers;
