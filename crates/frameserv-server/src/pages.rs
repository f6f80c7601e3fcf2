//! Text responses for the informational and administrative routes.

use crate::config::RenderRange;

const HTML_HEAD: &str = "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n";
const TEXT_HEAD: &str = "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nConnection: close\r\n\r\n";

/// Index page listing the available endpoints.
pub fn index_page() -> String {
    format!(
        "{HTML_HEAD}<html><head><title>frameserv</title></head>\n\
         <body><pre>\n\
         <h2>frameserv</h2>\n\
         <a href=\"info.txt\">Render info</a>\n\
         <a href=\"close.txt\">Stop rendering</a>\n\
         \n\
         Single frames: images/ppm/&lt;frame&gt;.ppm\n\
         All frames on one connection: images/ppm/all\n\
         Reconfigure and restart: new_render?&lt;query&gt;\n\
         </pre></body></html>\n"
    )
}

/// Render range, dimensions and rate, one `name value` pair per line.
pub fn info_page(range: &RenderRange, width: u32, height: u32) -> String {
    format!(
        "{TEXT_HEAD}start {}\nend {}\nwidth {width}\nheight {height}\nrate {}\nratescale 1\n",
        range.start(),
        range.end(),
        range.frame_rate(),
    )
}

/// Answer to `/new_render?`.
pub fn reconfigure_page(accepted: bool) -> String {
    let body = if accepted { "ok" } else { "Error" };
    format!("{TEXT_HEAD}{body}\n")
}

/// Answer to `/close.txt`.
pub fn goodbye_page() -> String {
    format!(
        "{HTML_HEAD}<html><head><title>frameserv</title></head>\n\
         <body><pre>Render stopped. Goodbye</pre></body></html>\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(page: &str) -> &str {
        page.split_once("\r\n\r\n").map(|(_, body)| body).unwrap_or("")
    }

    #[test]
    fn info_lists_fields_in_order() {
        let range = RenderRange::new(1, 250, 24).expect("range should be valid");
        let page = info_page(&range, 640, 480);
        assert!(page.starts_with("HTTP/1.1 200 OK\r\nContent-Type: text/plain"));
        assert_eq!(
            body(&page),
            "start 1\nend 250\nwidth 640\nheight 480\nrate 24\nratescale 1\n"
        );
    }

    #[test]
    fn reconfigure_bodies() {
        assert_eq!(body(&reconfigure_page(true)), "ok\n");
        assert_eq!(body(&reconfigure_page(false)), "Error\n");
    }

    #[test]
    fn html_pages() {
        let index = index_page();
        assert!(index.contains("Content-Type: text/html"));
        assert!(body(&index).contains("info.txt"));
        assert!(body(&index).contains("close.txt"));
        assert!(body(&goodbye_page()).contains("Goodbye"));
    }
}
