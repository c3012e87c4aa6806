#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_maxage: i64,
    pub port: u16,
    pub llm_url: String,
    pub model_name: String,
    pub llm_timeout_seconds: u64,
    pub frontend_url: String,
}

impl Config {
    pub fn init() -> Config {
        let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let jwt_secret = std::env::var("JWT_SECRET_KEY").expect("JWT_SECRET_KEY must be set");
        let jwt_maxage = std::env::var("JWT_MAXAGE").expect("JWT_MAXAGE must be set");
        let llm_url = std::env::var("LLM_URL").expect("LLM_URL must be set");
        let model_name = std::env::var("MODEL_NAME").expect("MODEL_NAME must be set");
        let llm_timeout_seconds = std::env::var("LLM_TIMEOUT_SECONDS").unwrap_or("20".to_string());
        let frontend_url = std::env::var("FRONTEND_URL").expect("FRONTEND_URL must be set");
        let port = std::env::var("PORT").unwrap_or("8000".to_string());

        Config {
            database_url,
            jwt_secret,
            jwt_maxage: jwt_maxage.parse::<i64>().unwrap(),
            port: port.parse::<u16>().unwrap(),
            llm_url,
            model_name,
            llm_timeout_seconds: llm_timeout_seconds.parse::<u64>().unwrap(),
            frontend_url,
        }
    }
}
