use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("frameserv {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: frameserv");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!("target: {}", env!("FRAMESERV_BUILD_TARGET"));
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!(
        "rustc: {}",
        option_env!("RUSTC_VERSION").unwrap_or("unknown")
    );
    println!("git_hash: {}", option_env!("GIT_HASH").unwrap_or("unknown"));
    println!(
        "features: server={}, cli=true",
        cfg!(feature = "server")
    );
    println!("default_port: {}", frameserv_server::DEFAULT_PORT);

    Ok(SUCCESS)
}
