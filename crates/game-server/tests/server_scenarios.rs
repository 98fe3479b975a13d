// crates/game-server/tests/server_scenarios.rs
//
// End-to-end sessions over real TCP on an ephemeral port.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use game_protocol::wire_types::{INSTRUCTIONS, NICKNAME_PROMPT, SERVER_FULL, WAITING_FOR_OPPONENT};
use game_protocol::{Frame, FRAME_LEN};
use game_server::outcome_log::OutcomeLog;
use game_server::server::{Server, ServerError};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

const WAIT: Duration = Duration::from_secs(5);
const QUIET: Duration = Duration::from_millis(200);

struct TestServer {
    addr: SocketAddr,
    cancel: CancellationToken,
    handle: JoinHandle<Result<(), ServerError>>,
    log_path: PathBuf,
    _dir: TempDir,
}

async fn start(max_players: usize) -> TestServer {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("logs.txt");

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let log = OutcomeLog::open(&log_path).await.unwrap();
    let cancel = CancellationToken::new();

    let server = Server::new(listener, log, max_players, cancel.clone());
    let addr = server.local_addr().unwrap();
    let handle = tokio::spawn(server.serve());

    TestServer {
        addr,
        cancel,
        handle,
        log_path,
        _dir: dir,
    }
}

impl TestServer {
    async fn stop(self) -> String {
        self.cancel.cancel();
        timeout(WAIT, self.handle)
            .await
            .expect("server stops in time")
            .expect("server task")
            .expect("clean shutdown");
        std::fs::read_to_string(&self.log_path).unwrap()
    }
}

async fn send(stream: &mut TcpStream, text: &str) {
    stream
        .write_all(Frame::from_text(text).as_bytes())
        .await
        .unwrap();
}

async fn recv(stream: &mut TcpStream) -> Frame {
    let mut buf = [0u8; FRAME_LEN];
    timeout(WAIT, stream.read_exact(&mut buf))
        .await
        .expect("frame in time")
        .expect("full frame");
    Frame::from(buf)
}

async fn recv_text(stream: &mut TcpStream) -> String {
    recv(stream).await.text()
}

async fn recv_board(stream: &mut TcpStream) -> Vec<String> {
    let mut rows = Vec::new();
    for _ in 0..5 {
        rows.push(recv_text(stream).await);
    }
    assert_eq!(recv_text(stream).await, INSTRUCTIONS);
    rows
}

async fn assert_quiet(stream: &mut TcpStream) {
    let mut buf = [0u8; 1];
    assert!(
        timeout(QUIET, stream.read(&mut buf)).await.is_err(),
        "unexpected data on the connection"
    );
}

/// Connect two players and finish both handshakes. `x` named "alice"
/// moves first, `o` is "bob".
async fn pair(addr: SocketAddr) -> (TcpStream, TcpStream) {
    let mut x = TcpStream::connect(addr).await.unwrap();
    let mut o = TcpStream::connect(addr).await.unwrap();

    assert_eq!(recv_text(&mut x).await, NICKNAME_PROMPT);
    assert_eq!(recv_text(&mut o).await, NICKNAME_PROMPT);

    send(&mut x, "alice").await;
    let rows = recv_board(&mut x).await;
    assert_eq!(rows[0], "- | - | - | - | -\t 00 | 01 | 02 | 03 | 04");

    // The chat proves bob's nickname was processed.
    send(&mut o, "bob").await;
    send(&mut o, "ready").await;
    assert_eq!(recv_text(&mut x).await, "[bob]: ready");

    (x, o)
}

/// One non-terminal move by `mover`.
async fn play(mover: &mut TcpStream, other: &mut TcpStream, cell: &str) -> Vec<String> {
    send(mover, cell).await;
    let rows = recv_board(other).await;
    assert_eq!(recv_text(mover).await, WAITING_FOR_OPPONENT);
    rows
}

fn outcome_lines(log: &str) -> Vec<&str> {
    log.lines().filter(|l| l.starts_with('#')).collect()
}

#[tokio::test]
async fn disconnect_mid_game_is_logged_once_and_ends_the_survivor() {
    let server = start(128).await;
    let (mut x, mut o) = pair(server.addr).await;

    let rows = play(&mut x, &mut o, "12").await;
    assert_eq!(rows[2], "- | - | X | - | -\t 10 | 11 | 12 | 13 | 14");

    drop(x);

    let line = recv_text(&mut o).await;
    assert!(line.starts_with('#'), "got {:?}", line);
    assert!(line.ends_with("player: alice versus player: bob undecided"), "got {:?}", line);
    assert!(recv(&mut o).await.is_sentinel());

    let log = server.stop().await;
    let records = outcome_lines(&log);
    assert_eq!(records.len(), 1, "log: {:?}", log);
    assert!(records[0].contains("alice") && records[0].contains("bob"));

    let lines: Vec<&str> = log.lines().collect();
    assert_eq!(lines[1], "------------X------------");
    assert_eq!(lines[2], "");
}

#[tokio::test]
async fn completed_line_wins_and_is_logged() {
    let server = start(128).await;
    let (mut x, mut o) = pair(server.addr).await;

    for (xc, oc) in [("00", "01"), ("06", "02"), ("12", "03"), ("18", "04")] {
        play(&mut x, &mut o, xc).await;
        play(&mut o, &mut x, oc).await;
    }

    send(&mut x, "24").await;
    let rows = recv_board(&mut o).await;
    assert_eq!(rows[4], "- | - | - | - | X\t 20 | 21 | 22 | 23 | 24");

    for side in [&mut x, &mut o] {
        let line = recv_text(side).await;
        assert!(line.ends_with("player: alice won against player: bob"), "got {:?}", line);
        assert!(recv(side).await.is_sentinel());
    }

    let log = server.stop().await;
    assert_eq!(outcome_lines(&log).len(), 1);
    assert!(log.contains("XOOOO-X-----X-----X-----X"));
}

#[tokio::test]
async fn out_of_turn_and_occupied_moves_are_ignored() {
    let server = start(128).await;
    let (mut x, mut o) = pair(server.addr).await;

    // Not bob's turn yet.
    send(&mut o, "05").await;
    assert_quiet(&mut x).await;

    play(&mut x, &mut o, "05").await;

    // Occupied cell, then a cell off the board.
    send(&mut o, "05").await;
    send(&mut o, "42").await;
    assert_quiet(&mut x).await;
    assert_quiet(&mut o).await;

    let rows = play(&mut o, &mut x, "06").await;
    assert_eq!(rows[1], "X | O | - | - | -\t 05 | 06 | 07 | 08 | 09");

    server.stop().await;
}

#[tokio::test]
async fn direct_chat_reaches_only_the_opponent() {
    let server = start(128).await;
    let (mut x, mut o) = pair(server.addr).await;
    let mut lone = TcpStream::connect(server.addr).await.unwrap();

    send(&mut x, "hi bob").await;
    assert_eq!(recv_text(&mut o).await, "[alice]: hi bob");

    // The broadcast is the first thing the waiting player ever sees,
    // so the direct line never reached it.
    send(&mut o, "@hello everyone").await;
    for side in [&mut x, &mut o, &mut lone] {
        assert_eq!(recv_text(side).await, "[bob]: hello everyone");
    }
    for side in [&mut x, &mut o, &mut lone] {
        assert_quiet(side).await;
    }

    server.stop().await;
}

#[tokio::test]
async fn full_server_rejects_new_connections() {
    let server = start(1).await;
    let mut first = TcpStream::connect(server.addr).await.unwrap();
    let mut second = TcpStream::connect(server.addr).await.unwrap();

    assert_eq!(recv_text(&mut second).await, SERVER_FULL);
    assert!(recv(&mut second).await.is_sentinel());
    assert_quiet(&mut first).await;

    server.stop().await;
}

#[tokio::test]
async fn shutdown_drains_every_connection() {
    let server = start(128).await;
    let (mut x, mut o) = pair(server.addr).await;
    let mut lone = TcpStream::connect(server.addr).await.unwrap();

    play(&mut x, &mut o, "00").await;

    // Make sure the lone player is registered before stopping.
    send(&mut x, "@sync").await;
    for side in [&mut x, &mut o, &mut lone] {
        assert_eq!(recv_text(side).await, "[alice]: sync");
    }

    let cancel = server.cancel.clone();
    cancel.cancel();

    for side in [&mut x, &mut o] {
        let line = recv_text(side).await;
        assert!(line.ends_with("undecided"), "got {:?}", line);
        assert!(line.contains("alice") && line.contains("bob"));
        assert!(recv(side).await.is_sentinel());
    }
    assert!(recv(&mut lone).await.is_sentinel());

    let log = server.stop().await;
    assert_eq!(outcome_lines(&log).len(), 1, "log: {:?}", log);
    assert!(log.contains("X------------------------"));
}

#[tokio::test]
async fn waiter_who_hangs_up_is_never_paired() {
    let server = start(128).await;

    let gone = TcpStream::connect(server.addr).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    drop(gone);
    tokio::time::sleep(QUIET).await;

    // The empty slot must not be matched with the next arrival.
    let mut first = TcpStream::connect(server.addr).await.unwrap();
    assert_quiet(&mut first).await;

    let mut second = TcpStream::connect(server.addr).await.unwrap();
    assert_eq!(recv_text(&mut first).await, NICKNAME_PROMPT);
    assert_eq!(recv_text(&mut second).await, NICKNAME_PROMPT);
    assert_quiet(&mut first).await;

    let log = server.stop().await;
    assert!(outcome_lines(&log).is_empty(), "log: {:?}", log);
}

#[tokio::test]
async fn partner_leaving_before_the_handshake_is_replaced() {
    let server = start(128).await;
    let mut x = TcpStream::connect(server.addr).await.unwrap();
    let mut gone = TcpStream::connect(server.addr).await.unwrap();

    assert_eq!(recv_text(&mut x).await, NICKNAME_PROMPT);
    assert_eq!(recv_text(&mut gone).await, NICKNAME_PROMPT);
    drop(gone);

    // No outcome and no sentinel: the game never started.
    assert_quiet(&mut x).await;

    let mut o = TcpStream::connect(server.addr).await.unwrap();
    assert_eq!(recv_text(&mut o).await, NICKNAME_PROMPT);

    send(&mut x, "alice").await;
    recv_board(&mut x).await;
    send(&mut o, "carol").await;
    send(&mut o, "ready").await;
    assert_eq!(recv_text(&mut x).await, "[carol]: ready");

    let rows = play(&mut x, &mut o, "12").await;
    assert_eq!(rows[2], "- | - | X | - | -\t 10 | 11 | 12 | 13 | 14");

    drop(x);
    let line = recv_text(&mut o).await;
    assert!(line.ends_with("player: alice versus player: carol undecided"), "got {:?}", line);
    assert!(recv(&mut o).await.is_sentinel());

    let log = server.stop().await;
    assert_eq!(outcome_lines(&log).len(), 1, "log: {:?}", log);
}
