//! A render loop driving the frame server directly, the way a render host does.
//!
//! Run with:
//!   cargo run --example embedded-render
//!
//! In another terminal:
//!   curl http://127.0.0.1:8080/info.txt
//!   curl -o frame.ppm http://127.0.0.1:8080/images/ppm/3
//!   curl http://127.0.0.1:8080/close.txt

use frameserv::server::{AbortToken, FrameServer, RenderRange, ServerConfig};

const WIDTH: u32 = 64;
const HEIGHT: u32 = 48;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut server = FrameServer::new(ServerConfig::default());
    let addr = server.start_listening()?;
    eprintln!("Listening on {addr}");

    let abort = AbortToken::new();
    let range = RenderRange::new(1, 10, 25)?;
    server.begin_render(range, WIDTH, HEIGHT, abort.clone())?;

    // One slot per frame of the range, as a real render pipeline would.
    for _ in range.start()..=range.end() {
        let frame = loop {
            if abort.is_triggered() {
                break None;
            }
            match server.next_frame_request() {
                Ok(Some(frame)) if range.contains(frame) => break Some(frame),
                Ok(Some(_)) => server.discard_pending_frame(),
                Ok(None) => {}
                Err(err) => eprintln!("no frame this iteration: {err}"),
            }
        };
        let Some(frame) = frame else { break };

        let shade = (frame * 25) as u8;
        let pixels: Vec<u8> = (0..WIDTH * HEIGHT)
            .flat_map(|_| [shade, 128, 255 - shade, 255])
            .collect();
        // A failed send has already closed the peer and set the abort token.
        match server.append_frame(&pixels, WIDTH, HEIGHT, frame) {
            Ok(true) => eprintln!("Served frame {frame}"),
            Ok(false) => {}
            Err(err) => eprintln!("Frame {frame} not delivered: {err}"),
        }
    }

    server.end_render();
    let request = server.last_change_request();
    if !request.is_empty() {
        eprintln!("Last change request: {request}");
    }
    Ok(())
}
