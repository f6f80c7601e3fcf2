use serde::Serialize;

use crate::client;
use crate::cmd::InfoArgs;
use crate::exit::{CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_json, print_pretty, print_raw, print_table, OutputFormat};

#[derive(Serialize, Debug, Default, PartialEq, Eq)]
struct RenderInfo {
    start: i32,
    end: i32,
    width: u32,
    height: u32,
    rate: i32,
    ratescale: i32,
}

pub fn run(args: InfoArgs, format: OutputFormat) -> CliResult<i32> {
    let mut response = client::get(&args.client, "/info.txt")?;
    let body = client::text_body(&mut response)?;

    if format == OutputFormat::Raw {
        print_raw(body.as_bytes());
        return Ok(SUCCESS);
    }

    let info = parse_info(&body)?;
    match format {
        OutputFormat::Json => print_json(&info),
        OutputFormat::Table => print_table(
            &["START", "END", "WIDTH", "HEIGHT", "RATE", "RATESCALE"],
            [vec![
                info.start.to_string(),
                info.end.to_string(),
                info.width.to_string(),
                info.height.to_string(),
                info.rate.to_string(),
                info.ratescale.to_string(),
            ]],
        ),
        _ => {
            println!("Render Info:");
            print_pretty(&[
                ("Frames:", format!("{}..={}", info.start, info.end)),
                ("Size:", format!("{}x{}", info.width, info.height)),
                ("Rate:", format!("{}/{} fps", info.rate, info.ratescale)),
            ]);
        }
    }
    Ok(SUCCESS)
}

fn parse_info(body: &str) -> CliResult<RenderInfo> {
    let mut info = RenderInfo::default();
    for line in body.lines().filter(|line| !line.trim().is_empty()) {
        let (name, value) = line
            .split_once(' ')
            .ok_or_else(|| CliError::new(DATA_INVALID, format!("malformed info line: {line}")))?;
        let invalid = || CliError::new(DATA_INVALID, format!("invalid value for {name}: {value}"));
        let value = value.trim();
        match name {
            "start" => info.start = value.parse().map_err(|_| invalid())?,
            "end" => info.end = value.parse().map_err(|_| invalid())?,
            "width" => info.width = value.parse().map_err(|_| invalid())?,
            "height" => info.height = value.parse().map_err(|_| invalid())?,
            "rate" => info.rate = value.parse().map_err(|_| invalid())?,
            "ratescale" => info.ratescale = value.parse().map_err(|_| invalid())?,
            _ => {}
        }
    }
    Ok(info)
}
