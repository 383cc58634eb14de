//! Replays a detections dump through the counter.
//!
//! Every line of the input holds the detections of one frame as a JSON array:
//! `[{"x1":10,"y1":20,"x2":50,"y2":120,"p":0.91,"c":0}, ...]`
//!
//! cargo run --example count_detections -- dets.jsonl 0,360 1280,360

use qcount::{CounterConfig, Detection, Pipeline, TrackerConfig};
use std::io::BufRead;

fn parse_point(s: &str) -> Option<(i32, i32)> {
    let (x, y) = s.split_once(',')?;

    Some((x.trim().parse().ok()?, y.trim().parse().ok()?))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);

    let in_file_name = args.next().ok_or("expected detections file name")?;
    let start = args
        .next()
        .as_deref()
        .and_then(parse_point)
        .ok_or("expected line start as `x,y`")?;
    let end = args
        .next()
        .as_deref()
        .and_then(parse_point)
        .ok_or("expected line end as `x,y`")?;

    let mut pipeline = Pipeline::new(TrackerConfig::default(), CounterConfig::new(start, end))?;

    let reader = std::io::BufReader::new(std::fs::File::open(in_file_name)?);

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;

        let dets: Vec<Detection> = match serde_json::from_str(&line) {
            Ok(dets) => dets,
            Err(err) => {
                eprintln!("line {}: wrong file format: {}", idx + 1, err);
                continue;
            }
        };

        let report = pipeline.process(&dets);

        for event in &report.events {
            println!(
                "frame {}: track {} {:?}",
                report.frame_index, event.track_id, event.direction
            );
        }
    }

    println!("{}", pipeline.final_report());

    Ok(())
}
