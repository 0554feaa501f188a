use extractor::{Extractor, FixtureExtractor, HttpExtractor};
use std::fs;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

fn write(root: &std::path::Path, rel: &str, body: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, body).unwrap();
}

#[tokio::test]
async fn fixture_extractor_reads_every_record_kind() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "teams/474.json", r#"{"id":"474","name":"Team Liquid","tag":"TL","roster":[{"id":"p1","name":"nAts"}]}"#);
    write(
        root,
        "team_matches/474.json",
        r#"[{"id":"1001","team1":"Team Liquid","team2":"FNATIC","score":"2 : 1","maps":[{"name":"Ascent","score":"13-9"}]}]"#,
    );
    write(
        root,
        "matches/1001.json",
        r#"{"id":"1001","team1":"Team Liquid","team2":"FNATIC","maps":[{"name":"Ascent","round_labels":["TL","FNC"],"round_markers":[{"side":"attack","winner":0},{"side":"defense","winner":null}]}]}"#,
    );
    write(root, "player_matches/p1.json", r#"["1001","1000"]"#);
    write(root, "performance/1001_p1.json", r#"[{"map":"1 Ascent","advanced":{"ECON":"55"}}]"#);

    let ex = FixtureExtractor::new(root);
    let profile = ex.get_team_profile("474").await.unwrap();
    assert_eq!(profile.tag.as_deref(), Some("TL"));
    assert_eq!(profile.roster[0].id.as_deref(), Some("p1"));

    let matches = ex.list_team_matches("474").await.unwrap();
    assert_eq!(matches[0].score, Some((2, 1)));
    assert_eq!(matches[0].maps[0].score, Some((13, 9)));

    let detail = ex.get_match_detail("1001").await.unwrap();
    assert_eq!(detail.maps[0].round_markers.len(), 2);
    assert_eq!(detail.maps[0].round_labels, Some(("TL".to_string(), "FNC".to_string())));

    assert_eq!(ex.list_player_matches("p1").await.unwrap(), vec!["1001", "1000"]);
    let perf = ex.get_player_performance("1001", "p1").await.unwrap();
    assert_eq!(perf[0].advanced["ECON"], "55");
}

#[tokio::test]
async fn fixture_extractor_reports_missing_and_bad_files() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "matches/2.json", "{not json");
    let ex = FixtureExtractor::new(dir.path());

    let missing = ex.get_match_detail("1").await.unwrap_err();
    assert!(format!("{missing:#}").contains("fixture not readable"));
    let bad = ex.get_match_detail("2").await.unwrap_err();
    assert!(format!("{bad:#}").contains("invalid fixture JSON"));
    assert!(ex.get_team_profile("../2").await.is_err());
}

/// Minimal HTTP/1.1 responder: `/teams/474` answers a profile, anything
/// else 404. Serves `requests` connections then stops.
async fn serve(requests: usize) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        for _ in 0..requests {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = sock.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
            }
            let head = String::from_utf8_lossy(&buf);
            let path = head.split_whitespace().nth(1).unwrap_or("").to_string();
            let (status, body) = if path == "/teams/474" {
                ("200 OK", r#"{"id":"474","name":"Team Liquid","tag":"TL"}"#)
            } else {
                ("404 Not Found", r#"{"error":"not found"}"#)
            };
            let resp = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            sock.write_all(resp.as_bytes()).await.unwrap();
            sock.shutdown().await.ok();
        }
    });
    format!("http://{addr}/")
}

#[tokio::test]
async fn http_extractor_decodes_and_surfaces_status() {
    let base = serve(2).await;
    let ex = HttpExtractor::new(base, Duration::ZERO);
    assert!(!ex.base_url().ends_with('/'));

    let profile = ex.get_team_profile("474").await.unwrap();
    assert_eq!(profile.name, "Team Liquid");
    assert!(profile.roster.is_empty());

    let err = ex.get_match_detail("999").await.unwrap_err();
    assert!(err.to_string().contains("HTTP 404"), "{err:#}");
}

#[tokio::test]
async fn http_extractor_spaces_requests() {
    let base = serve(2).await;
    let ex = HttpExtractor::new(base, Duration::from_millis(150));
    let started = Instant::now();
    let _ = ex.get_team_profile("474").await;
    let _ = ex.get_team_profile("474").await;
    assert!(started.elapsed() >= Duration::from_millis(150));
}

#[tokio::test]
async fn http_extractor_rejects_unsafe_ids_without_a_request() {
    let ex = HttpExtractor::new("http://127.0.0.1:9", Duration::ZERO);
    let err = ex.list_team_matches("1/../../admin").await.unwrap_err();
    assert!(err.to_string().contains("invalid team id"));
}
