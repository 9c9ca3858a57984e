use dotenvy::dotenv;
use tracing::{error, info};
use uuid::Uuid;

fn init_logging(format: &str) {
    common::utils::logging::init_logging(format);
    info!(service = "radsafe", event = "logger_init", format, "tracing subscriber initialized");
}

fn main() -> std::process::ExitCode {
    // 提前加载 .env，使得 RUST_LOG / DB_FILE 等环境变量生效
    dotenv().ok();

    let cfg = match configs::AppConfig::load_and_validate() {
        Ok(cfg) => cfg,
        Err(e) => {
            common::utils::logging::init_logging_default();
            error!(service = "radsafe", event = "config_invalid", error = %e, "failed to load configuration");
            return std::process::ExitCode::FAILURE;
        }
    };
    init_logging(&cfg.logging.format);

    let service_id = Uuid::new_v4();
    let pid = std::process::id();
    let version = env!("CARGO_PKG_VERSION");

    std::panic::set_hook(Box::new(move |info| {
        error!(
            service = "radsafe",
            event = "panic",
            %service_id,
            pid,
            message = %info,
            "unhandled panic occurred"
        );
    }));

    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();
    if let Some(w) = cfg.server.worker_threads {
        builder.worker_threads(w);
    }
    let rt = match builder.build() {
        Ok(rt) => rt,
        Err(e) => {
            error!(service = "radsafe", event = "runtime_build_failed", error = %e, "failed to build tokio runtime");
            return std::process::ExitCode::FAILURE;
        }
    };

    info!(
        service = "radsafe",
        event = "start",
        %service_id,
        pid,
        version,
        threads = cfg.server.worker_threads.unwrap_or_default(),
        db_file = %cfg.storage.db_file,
        "radsafe server starting"
    );

    match rt.block_on(server::run(cfg)) {
        Ok(()) => {
            info!(service = "radsafe", event = "stop", %service_id, pid, "server stopped normally");
            std::process::ExitCode::SUCCESS
        }
        Err(e) => {
            error!(service = "radsafe", event = "run_failed", error = %e, "server::run returned error");
            std::process::ExitCode::FAILURE
        }
    }
}
