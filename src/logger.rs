use env_logger::{Builder, Env};
use log::LevelFilter;
use std::io::Write;

/// Фильтр по умолчанию, если `RUST_LOG` не задан
pub const DEFAULT_FILTER: &str = "warn,stimuli_tts=info";

pub fn init_logger() {
    init_logger_with(DEFAULT_FILTER);
}

/// Инициализировать логгер с фильтром по умолчанию `default_filter`
pub fn init_logger_with(default_filter: &str) {
    let env = Env::default().filter_or("RUST_LOG", default_filter);
    let mut builder = Builder::from_env(env);

    // Шумные модули AWS SDK и HTTP-стека
    builder
        .filter_module("aws_config", LevelFilter::Warn)
        .filter_module("aws_smithy_runtime", LevelFilter::Warn)
        .filter_module("hyper", LevelFilter::Error)
        .filter_module("rustls", LevelFilter::Error)
        .filter_module("symphonia", LevelFilter::Warn)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {}: {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .target(env_logger::Target::Stderr);

    // Повторная инициализация (например, в тестах) не считается ошибкой
    let _ = builder.try_init();
}
