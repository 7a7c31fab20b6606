//! terraprobe CLI 진입점
//!
//! 인자 파싱과 서브커맨드 디스패치, 종료 코드 매핑만 담당합니다.
//! 실제 동작은 `commands/` 모듈에 있습니다.

mod cli;
mod commands;
mod error;
mod logging;
mod output;

use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::output::OutputWriter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let writer = OutputWriter::new(cli.output);

    // validate/list는 stdout이 파싱 가능해야 하므로 tracing을 켜지 않음
    let result = match cli.command {
        Commands::Run(args) => {
            commands::run::execute(args, &cli.config, cli.log_level.as_deref(), &writer).await
        }
        Commands::Validate(args) => commands::validate::execute(args, &cli.config, &writer).await,
        Commands::List(args) => commands::list::execute(args, &writer).await,
    };

    if let Err(e) = result {
        use colored::Colorize;
        eprintln!("{} {e}", "error:".red().bold());
        std::process::exit(e.exit_code());
    }
}
