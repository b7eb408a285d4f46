//! Drive a small random graph to equilibrium and print layout statistics.
//!
//! Run with: cargo run --example bundled_layout

use std::time::Instant;

use plexus_sim::{
    names, EdgeList, HeadlessTarget, LockUpdate, PhysicsUpdate, SimConfig, Simulation,
};

fn main() {
    tracing_subscriber::fmt::init();

    let node_count: u32 = 500;

    // Points on a spiral, edges forming a path plus random chords.
    let mut points = Vec::with_capacity(node_count as usize * 2);
    for i in 0..node_count {
        let angle = i as f32 * 0.17;
        let radius = 20.0 + i as f32 * 0.4;
        points.push(radius * angle.cos());
        points.push(radius * angle.sin());
    }

    let mut edges: Vec<u32> = Vec::new();
    for i in 1..node_count {
        edges.push(i - 1);
        edges.push(i);
    }
    for i in 0..node_count / 4 {
        let source = (i * 17) % node_count;
        let target = (i * 31 + 7) % node_count;
        if source != target {
            edges.push(source);
            edges.push(target);
        }
    }
    let num_edges = edges.len() as u32 / 2;

    let mut degrees = vec![0u32; node_count as usize];
    for pair in edges.chunks(2) {
        degrees[pair[0] as usize] += 1;
        degrees[pair[1] as usize] += 1;
    }

    // One work item per edge keeps the demo simple; real ingestion balances
    // runs of edges per worker.
    let work_items: Vec<u32> = (0..num_edges).flat_map(|e| [e, 1]).collect();
    let backwards_edges: Vec<u32> = edges
        .chunks(2)
        .flat_map(|pair| [pair[1], pair[0]])
        .collect();

    let forwards = EdgeList {
        edges: edges.clone(),
        degrees: degrees.clone(),
        work_items: work_items.clone(),
    };
    let backwards = EdgeList {
        edges: backwards_edges,
        degrees,
        work_items,
    };

    // One mid-point per edge, seeded at the edge midpoint.
    let mid_points: Vec<f32> = edges
        .chunks(2)
        .flat_map(|pair| {
            let (s, t) = (pair[0] as usize, pair[1] as usize);
            [
                (points[2 * s] + points[2 * t]) / 2.0,
                (points[2 * s + 1] + points[2 * t + 1]) / 2.0,
            ]
        })
        .collect();

    println!("Creating simulation: {node_count} points, {num_edges} edges...");
    let mut sim = pollster::block_on(Simulation::create(
        Box::new(HeadlessTarget::default()),
        SimConfig::default(),
    ))
    .expect("failed to create simulation");

    sim.set_points(&points, None, None).expect("set_points failed");
    sim.set_edges(&forwards, &backwards, &mid_points, None)
        .expect("set_edges failed");

    // Unfreeze the bundled geometry and tune the springs a little.
    sim.set_locked(LockUpdate {
        lock_midpoints: Some(false),
        lock_midedges: Some(false),
        ..Default::default()
    });
    sim.set_physics(PhysicsUpdate {
        spring_distance: Some(30.0),
        ..Default::default()
    });

    let iterations = 120;
    let start = Instant::now();
    for step in 0..iterations {
        sim.tick(step).expect("tick failed");

        if step % 30 == 0 {
            let positions = sim.read_points().expect("readback failed");
            let (min_x, max_x) = positions
                .chunks(2)
                .map(|p| p[0])
                .fold((f32::MAX, f32::MIN), |(lo, hi), x| (lo.min(x), hi.max(x)));
            println!("step {step}: x span [{min_x:.1}, {max_x:.1}]");
        }
    }
    let elapsed = start.elapsed();

    println!(
        "\n{} ticks in {:.2?} ({:.1} ticks/sec)",
        iterations,
        elapsed,
        iterations as f64 / elapsed.as_secs_f64()
    );
    println!(
        "curPoints stamp {:?} at global tick {}",
        sim.buffer_stamp(names::CUR_POINTS),
        sim.current_tick()
    );
}
