use std::env;
use dotenvy::dotenv;

#[derive(Clone)]
pub struct Config {
    pub schedule_file: String,
    pub reconcile_tolerance: f64,
    pub log_dir: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        Self {
            schedule_file: env::var("SCHEDULE_FILE").expect("SCHEDULE_FILE must be set"),
            reconcile_tolerance: env::var("RECONCILE_TOLERANCE")
                .unwrap_or_else(|_| "0.05".to_string()) // cents of drift allowed on save
                .parse()
                .unwrap(),
            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
        }
    }
}
