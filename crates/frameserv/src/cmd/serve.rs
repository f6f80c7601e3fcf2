use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use frameserv_server::{
    AbortToken, FrameServer, RenderLoop, RenderRange, RenderSummary, ServerConfig,
};
use serde::Serialize;
use tracing::info;

use crate::cmd::ServeArgs;
use crate::exit::{server_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{now_unix_seconds, print_json, print_pretty, print_table, OutputFormat};
use crate::pattern::TestPattern;

#[derive(Serialize)]
struct ServeOutput {
    port: u16,
    renders: u32,
    frames_served: u64,
    requests_answered: u64,
    requests_dropped: u64,
    aborted: bool,
    interrupted: bool,
    last_change_request: String,
    timestamp: u64,
}

pub fn run(args: ServeArgs, format: OutputFormat) -> CliResult<i32> {
    let range = RenderRange::new(args.start, args.end, args.rate)
        .map_err(|err| server_error("invalid render range", err))?;

    let config = ServerConfig::default()
        .with_bind_address(args.bind)
        .with_port(args.port)
        .with_accept_timeout(Some(args.accept_timeout))
        .with_request_timeout(args.request_timeout);
    let mut server = FrameServer::new(config);
    server.set_continuous_mode(args.continuous);
    let addr = server
        .start_listening()
        .map_err(|err| server_error("listen failed", err))?;

    let abort = AbortToken::new();
    let interrupted = Arc::new(AtomicBool::new(false));
    install_ctrlc_handler(abort.clone(), interrupted.clone())?;

    let mut pattern = TestPattern::new(args.width, args.height);
    let render_loop = RenderLoop::new(range, args.width, args.height).with_abort(abort.clone());
    let changes = server.change_requests();

    let mut out = ServeOutput {
        port: addr.port(),
        renders: 0,
        frames_served: 0,
        requests_answered: 0,
        requests_dropped: 0,
        aborted: false,
        interrupted: false,
        last_change_request: String::new(),
        timestamp: 0,
    };

    loop {
        let seen = changes.latest();
        let summary = render_loop
            .run(&mut server, &mut pattern)
            .map_err(|err| server_error("render failed", err))?;
        accumulate(&mut out, &summary);

        let reconfigured = changes.latest() != seen;
        if interrupted.load(Ordering::SeqCst) || !(args.restart_on_reconfigure && reconfigured) {
            break;
        }
        info!(query = %changes.get(), "restarting render after reconfigure request");
        abort.reset();
    }

    server.stop_listening();
    out.interrupted = interrupted.load(Ordering::SeqCst);
    out.last_change_request = changes.get();
    out.timestamp = now_unix_seconds();
    print_summary(&out, format);
    Ok(SUCCESS)
}

fn accumulate(out: &mut ServeOutput, summary: &RenderSummary) {
    out.renders += 1;
    out.frames_served += summary.frames_served;
    out.requests_answered += summary.requests_answered;
    out.requests_dropped += summary.requests_dropped;
    out.aborted = summary.aborted;
}

fn print_summary(out: &ServeOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table => print_table(
            &["PORT", "RENDERS", "FRAMES", "ANSWERED", "DROPPED", "ABORTED", "CHANGE REQUEST"],
            [vec![
                out.port.to_string(),
                out.renders.to_string(),
                out.frames_served.to_string(),
                out.requests_answered.to_string(),
                out.requests_dropped.to_string(),
                out.aborted.to_string(),
                out.last_change_request.clone(),
            ]],
        ),
        OutputFormat::Pretty => {
            println!("Render Summary:");
            print_pretty(&[
                ("Port:", out.port.to_string()),
                ("Renders:", out.renders.to_string()),
                ("Frames served:", out.frames_served.to_string()),
                ("Requests answered:", out.requests_answered.to_string()),
                ("Requests dropped:", out.requests_dropped.to_string()),
                ("Aborted:", out.aborted.to_string()),
                ("Interrupted:", out.interrupted.to_string()),
                ("Change request:", out.last_change_request.clone()),
            ]);
        }
        OutputFormat::Raw => println!("{}", out.last_change_request),
    }
}

fn install_ctrlc_handler(abort: AbortToken, interrupted: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        interrupted.store(true, Ordering::SeqCst);
        abort.trigger();
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
