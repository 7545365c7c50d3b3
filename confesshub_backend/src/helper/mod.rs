pub mod account_helpers;
pub mod admin_helpers;
pub mod anonymous_names;
pub mod post_helpers;
pub mod report_helpers;
pub mod sanitization_helpers;
