use std::io::Write;
use std::time::Duration;

use tempfile::NamedTempFile;
use tokio::sync::broadcast;
use tokio::time::timeout;

use mbcon::engine::{Engine, EngineOptions, Event};
use mbcon::memory::DeviceMemory;
use mbcon::script;
use mbcon::transport::MemoryTransport;

fn spawn_engine() -> Engine {
    let transport = MemoryTransport::new(DeviceMemory::new(64, 64), 1);
    Engine::spawn(
        transport,
        EngineOptions::default()
            .with_unit_id(1)
            .with_idle_window(Duration::from_millis(50)),
    )
}

fn script_file(contents: &str) -> NamedTempFile {
    let mut f = NamedTempFile::new().expect("create temp script");
    f.write_all(contents.as_bytes()).expect("write script");
    f
}

async fn next_event(rx: &mut broadcast::Receiver<Event>) -> Event {
    timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed")
}

#[tokio::test]
async fn script_runs_commands_in_order_and_drains() {
    let file = script_file(
        "# demo script\n\
         echo one\n\
         \n\
         echo two   # inline comment\n\
         fc6 3 99\n",
    );
    let engine = spawn_engine();
    let mut rx = engine.subscribe();

    script::run_script(&engine, file.path()).await.expect("run script");

    let mut infos = Vec::new();
    while infos.len() < 2 {
        if let Event::Info(s) = next_event(&mut rx).await {
            infos.push(s);
        }
    }
    assert_eq!(infos, ["one", "two"]);

    // the write from the script landed in device memory
    engine.enqueue("fc3", vec!["3".into(), "1".into()]);
    loop {
        if let Event::Response(line) = next_event(&mut rx).await {
            assert!(line.ends_with("0063"), "line was {line:?}");
            break;
        }
    }
}

#[tokio::test]
async fn script_with_exit_stops_the_session() {
    let file = script_file("echo before\nexit\necho never\n");
    let engine = spawn_engine();
    let mut rx = engine.subscribe();

    script::run_script(&engine, file.path()).await.expect("run script");

    let mut saw_before = false;
    let mut saw_end = false;
    loop {
        match timeout(Duration::from_millis(500), rx.recv()).await {
            Ok(Ok(Event::Info(s))) => {
                assert_eq!(s, "before");
                saw_before = true;
            }
            Ok(Ok(Event::End(None))) => {
                saw_end = true;
                break;
            }
            Ok(Ok(Event::End(Some(e)))) => panic!("unexpected fatal end: {e}"),
            Ok(Ok(_)) => {}
            Ok(Err(e)) => panic!("event channel error: {e}"),
            Err(_) => panic!("timed out before end event"),
        }
    }
    assert!(saw_before && saw_end);
}

#[tokio::test]
async fn empty_script_returns_without_waiting() {
    let file = script_file("# nothing but comments\n\n   \n");
    let engine = spawn_engine();

    timeout(Duration::from_millis(200), script::run_script(&engine, file.path()))
        .await
        .expect("empty script must not block")
        .expect("run script");
}

#[tokio::test]
async fn script_wait_covers_every_queued_command() {
    // a short idle window must not end the wait while the tail is still queued
    let transport = MemoryTransport::new(DeviceMemory::new(64, 64), 1);
    let engine = Engine::spawn(
        transport,
        EngineOptions::default()
            .with_unit_id(1)
            .with_idle_window(Duration::from_millis(1)),
    );
    let file = script_file("delay 120\nfc6 0 7\n");

    let started = std::time::Instant::now();
    script::run_script(&engine, file.path()).await.expect("run script");
    assert!(started.elapsed() >= Duration::from_millis(120));

    // the write queued after the delay had already landed when we returned
    let mut rx = engine.subscribe();
    engine.enqueue("fc3", vec!["0".into(), "1".into()]);
    loop {
        if let Event::Response(line) = next_event(&mut rx).await {
            assert_eq!(line, "0000: 0007");
            break;
        }
    }
}

#[tokio::test]
async fn script_on_a_stopped_engine_returns_immediately() {
    let engine = spawn_engine();
    let mut rx = engine.subscribe();
    engine.enqueue("exit", vec![]);
    loop {
        if let Event::End(_) = next_event(&mut rx).await {
            break;
        }
    }

    let file = script_file("echo dropped\n");
    timeout(Duration::from_millis(200), script::run_script(&engine, file.path()))
        .await
        .expect("stopped engine must not block the script runner")
        .expect("run script");
}

#[tokio::test]
async fn missing_script_file_is_an_io_error() {
    let engine = spawn_engine();
    let err = script::run_script(&engine, "/no/such/script.txt")
        .await
        .unwrap_err();
    assert!(matches!(err, mbcon::MbconError::Io(_)));
}
