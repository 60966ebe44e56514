use lathekit_camtools::generate;
use lathekit_core::{GeometryModel, JobDefinition, Point2, Polyline, Tool, Units};
use lathekit_visualizer::{parse_waypoints, ToolpathSimulator, Waypoint};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

type Events = Arc<Mutex<Vec<(char, Waypoint)>>>;
type Callback = Box<dyn FnMut(Waypoint) + Send>;

/// Shared event log plus a factory for callbacks that tag what they record.
fn recorder() -> (Events, impl Fn(char) -> Callback) {
    let events: Events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let make = move |label: char| -> Callback {
        let sink = Arc::clone(&sink);
        Box::new(move |wp: Waypoint| sink.lock().push((label, wp)))
    };
    (events, make)
}

fn long_program(lines: usize) -> String {
    (0..lines).map(|i| format!("G1 X{} Z0\n", i)).collect()
}

#[test]
fn test_generated_program_round_trip() {
    let model = GeometryModel::from_iter([Polyline::new(vec![
        Point2::new(0.0, 0.0),
        Point2::new(5.0, 0.0),
    ])]);
    let job = JobDefinition::new(
        Units::Mm,
        5.0,
        0.5,
        vec![Tool::new(1, "Turning", 6.0, 0.2, 1200.0)],
    );
    let gcode = generate(&model, &job, 0.2, 1200.0, 1.0);

    let path = parse_waypoints(&gcode);
    assert_eq!(
        path,
        vec![
            Waypoint::new(0.0, 5.0),
            Waypoint::new(0.0, 0.0),
            Waypoint::new(0.0, 0.0),
            Waypoint::new(5.0, 0.0),
            Waypoint::new(5.0, 5.0),
        ]
    );
}

#[tokio::test]
async fn test_new_run_cancels_previous_run() {
    let mut sim = ToolpathSimulator::new(Duration::from_millis(5));
    sim.load(&long_program(200));
    let (events, make) = recorder();

    sim.start(1.0, make('A'));
    tokio::time::sleep(Duration::from_millis(30)).await;
    sim.start(4.0, make('B'));
    let a_before = events.lock().iter().filter(|(l, _)| *l == 'A').count();
    sim.wait().await;

    let events = events.lock();
    let a_after = events.iter().filter(|(l, _)| *l == 'A').count();
    assert_eq!(a_before, a_after);
    assert!(a_after < 200);

    let first_b = events.iter().position(|(l, _)| *l == 'B').unwrap();
    assert!(events[first_b..].iter().all(|(l, _)| *l == 'B'));
    assert_eq!(events.len() - first_b, 200);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_cancellation_holds_across_threads() {
    let mut sim = ToolpathSimulator::new(Duration::from_micros(200));
    sim.load(&long_program(2000));
    let (events, make) = recorder();

    for label in ['A', 'B', 'C', 'D'] {
        sim.start(1.0, make(label));
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    sim.start(1.0, make('E'));
    let snapshot = events.lock().len();
    tokio::time::sleep(Duration::from_millis(20)).await;
    sim.pause();

    let events = events.lock();
    assert!(events[snapshot..].iter().all(|(l, _)| *l == 'E'));
    let labels: Vec<char> = events.iter().map(|(l, _)| *l).collect();
    let mut sorted = labels.clone();
    sorted.sort();
    assert_eq!(labels, sorted, "runs interleaved: {:?}", labels);
}

#[tokio::test]
async fn test_pause_keeps_path_and_restarts_from_beginning() {
    let mut sim = ToolpathSimulator::new(Duration::from_millis(5));
    sim.load(&long_program(100));
    let (events, make) = recorder();

    sim.start(1.0, make('A'));
    tokio::time::sleep(Duration::from_millis(20)).await;
    sim.pause();
    assert!(!sim.is_running());
    assert_eq!(sim.waypoints().len(), 100);
    let emitted = events.lock().len();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(events.lock().len(), emitted);

    sim.start(100.0, make('B'));
    sim.wait().await;
    let events = events.lock();
    let first_b = events.iter().position(|(l, _)| *l == 'B').unwrap();
    assert_eq!(events[first_b].1, Waypoint::new(0.0, 0.0));
    assert_eq!(events.len() - first_b, 100);
}

#[tokio::test]
async fn test_stop_clears_path() {
    let mut sim = ToolpathSimulator::new(Duration::from_millis(5));
    sim.load(&long_program(50));
    let (events, make) = recorder();

    sim.start(1.0, make('A'));
    sim.stop();
    assert!(sim.waypoints().is_empty());

    sim.start(1.0, make('B'));
    sim.wait().await;
    assert!(events.lock().iter().all(|(l, _)| *l != 'B'));
}
