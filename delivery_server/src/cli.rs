use std::{env, env::VarError};

/// The server takes no arguments. Any argument prints the help text and the current configuration instead.
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        display_readme();
        display_envs();
    }
    has_cli_args
}

fn display_readme() {
    const README: &str = include_str!("./cli-help.txt");
    println!("\n{README}\n");
}

fn display_envs() {
    const DISPLAY_ENVS: [&str; 10] = [
        "RUST_LOG",
        "DLV_DATABASE_URL",
        "DLV_DB_MAX_CONNECTIONS",
        "DLV_RUN_MIGRATIONS",
        "DLV_INTEREST_JOB_INTERVAL",
        "DLV_OVERDUE_JOB_INTERVAL",
        "DLV_OVERDUE_AFTER_DAYS",
        "DLV_JOB_PAGE_SIZE",
        "DLV_JOB_DEADLINE",
        "DLV_EVENT_BUFFER_SIZE",
    ];

    println!("Current environment values:");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}
