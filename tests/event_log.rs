use alphasolve::event_bus::{Event, EventBus, EventSink, FileSink, JsonLinesSink};

#[tokio::test]
async fn worker_log_file_carries_header_lines_and_raw_fragments() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("worker/alpha_solve_0.log");

    let sink = FileSink::create(&path).unwrap();
    let mut bus = EventBus::with_sinks(vec![Box::new(sink) as Box<dyn EventSink>]);
    let logger = bus.logger();
    let listener = bus.listen_for_events();

    logger.info("solver", "event=prompt_built prompt_len=120");
    logger.fragment("stream");
    logger.fragment("ed text");
    logger.stream_end();
    logger.error("verifier", "event=exec_exception error=boom");

    drop(logger);
    drop(bus);
    listener.await.unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(contents.contains("AlphaSolve worker log"));
    assert!(contents.contains("│ INFO     │ [solver] event=prompt_built prompt_len=120"));
    assert!(contents.contains("│ ERROR    │ [verifier] event=exec_exception error=boom"));
    // Fragments land verbatim, joined, closed by the stream end.
    assert!(contents.contains("streamed text\n"));

    // Structured lines open with a millisecond timestamp.
    let line = contents
        .lines()
        .find(|l| l.contains("[solver]"))
        .unwrap();
    let date = &line[..23];
    assert_eq!(date.len(), "2026-08-01 10:30:00.123".len());
    assert!(date[..4].chars().all(|c| c.is_ascii_digit()));
}

#[tokio::test]
async fn json_lines_sink_emits_one_object_per_event() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.jsonl");

    let sink = JsonLinesSink::create(&path).unwrap();
    let mut bus = EventBus::with_sinks(vec![Box::new(sink) as Box<dyn EventSink>]);
    let logger = bus.logger();
    let listener = bus.listen_for_events();

    logger.info("refiner", "event=refine_done lemma_id=3");
    logger.fragment("partial");

    drop(logger);
    drop(bus);
    listener.await.unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 2);

    let first: Event = serde_json::from_str(lines[0]).unwrap();
    assert!(matches!(first, Event::Log { module, .. } if module == "refiner"));
    let second: Event = serde_json::from_str(lines[1]).unwrap();
    assert!(matches!(second, Event::Fragment { text } if text == "partial"));
}
