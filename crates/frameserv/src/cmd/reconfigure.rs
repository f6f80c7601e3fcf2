use serde::Serialize;

use crate::client;
use crate::cmd::ReconfigureArgs;
use crate::exit::{CliResult, FAILURE, SUCCESS};
use crate::output::{print_json, print_raw, OutputFormat};

#[derive(Serialize)]
struct ReconfigureOutput<'a> {
    query: &'a str,
    accepted: bool,
    response: &'a str,
}

pub fn run(args: ReconfigureArgs, format: OutputFormat) -> CliResult<i32> {
    let mut response = client::get(&args.client, &format!("/new_render?{}", args.query))?;
    let body = client::text_body(&mut response)?;
    let answer = body.trim();
    let accepted = answer == "ok";

    match format {
        OutputFormat::Json => print_json(&ReconfigureOutput {
            query: &args.query,
            accepted,
            response: answer,
        }),
        OutputFormat::Raw => print_raw(body.as_bytes()),
        OutputFormat::Table | OutputFormat::Pretty => {
            if accepted {
                println!("render change request accepted: {}", args.query);
            } else {
                println!("render change request refused ({answer})");
            }
        }
    }

    Ok(if accepted { SUCCESS } else { FAILURE })
}
