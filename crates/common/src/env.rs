use std::env::VarError;

/// reads `key` from the process environment, loading a `.env`
/// file from the working directory (or its parents) first if present
pub fn get_env_var(key: &str) -> Result<String, VarError> {
    dotenvy::dotenv().ok();
    std::env::var(key)
}
