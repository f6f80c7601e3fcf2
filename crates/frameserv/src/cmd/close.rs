use serde::Serialize;

use crate::client;
use crate::cmd::CloseArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_json, print_raw, OutputFormat};

#[derive(Serialize)]
struct CloseOutput {
    stopped: bool,
}

pub fn run(args: CloseArgs, format: OutputFormat) -> CliResult<i32> {
    let mut response = client::get(&args.client, "/close.txt")?;
    let body = client::text_body(&mut response)?;
    let stopped = body.contains("Goodbye");

    match format {
        OutputFormat::Json => print_json(&CloseOutput { stopped }),
        OutputFormat::Raw => print_raw(body.as_bytes()),
        OutputFormat::Table | OutputFormat::Pretty => println!("render stopped"),
    }
    Ok(SUCCESS)
}
