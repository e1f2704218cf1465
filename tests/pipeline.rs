//! Scenarios S4/S5 from spec.md §8: a bounded single-consumer pipeline and
//! a fan-out two-consumer pipeline, both on the parallel-pipeline engine.

use rayshape_kernel::node::Node;
use rayshape_kernel::node_id::NodeId;
use rayshape_kernel::{Edge, Graph, ParallelMode, Result};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Produces `0, 1, 2, ...` as fast as backpressure allows, forever. Relies
/// entirely on `Graph::deinit`'s edge termination to stop it -- it never
/// terminates its own output.
struct Produce {
    edge: Arc<Edge>,
    next: i32,
}
impl Node for Produce {
    fn run(&mut self) -> Result<()> {
        self.edge.set_value(self.next);
        self.next += 1;
        Ok(())
    }
}

struct Collect {
    edge: Arc<Edge>,
    id: Option<NodeId>,
    out: Arc<Mutex<Vec<i32>>>,
    delay: Duration,
}
impl Node for Collect {
    fn bind(&mut self, id: NodeId) {
        self.id = Some(id);
    }
    fn run(&mut self) -> Result<()> {
        if let Some(packet) = self.id.and_then(|id| self.edge.get(id)) {
            if let Some(v) = packet.get::<i32>() {
                self.out.lock().unwrap().push(*v);
            }
        }
        std::thread::sleep(self.delay);
        Ok(())
    }
}

#[test]
fn bounded_pipeline_never_exceeds_queue_and_delivers_in_order() {
    let g = Graph::new("s4");
    g.set_parallel_type(ParallelMode::Pipeline);

    let e = g.create_edge_with_queue("items", 2).unwrap();
    let edge = g.edge_handle(e);
    g.create_node("producer", Produce { edge: edge.clone(), next: 0 }, vec![], vec![e]).unwrap();

    let collected = Arc::new(Mutex::new(Vec::new()));
    g.create_node(
        "consumer",
        Collect { edge: edge.clone(), id: None, out: collected.clone(), delay: Duration::from_millis(1) },
        vec![e],
        vec![],
    )
    .unwrap();

    g.init().unwrap();

    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    loop {
        if collected.lock().unwrap().len() >= 100 || std::time::Instant::now() > deadline {
            break;
        }
        std::thread::sleep(Duration::from_millis(5));
        assert!(edge.queue_len() <= 2, "pipeline edge exceeded its queue bound");
    }

    g.deinit().unwrap();

    let got = collected.lock().unwrap().clone();
    assert!(got.len() >= 100, "consumer must observe at least the first 100 produced packets");
    assert_eq!(&got[..100], (0..100).collect::<Vec<_>>().as_slice(), "consumer must observe packets in producer order");
}

#[test]
fn two_consumers_each_observe_every_packet_in_order() {
    let g = Graph::new("s5");
    g.set_parallel_type(ParallelMode::Pipeline);

    let e = g.create_edge("items").unwrap();
    let edge = g.edge_handle(e);
    g.create_node("producer", Produce { edge: edge.clone(), next: 0 }, vec![], vec![e]).unwrap();

    let c1_out = Arc::new(Mutex::new(Vec::new()));
    let c2_out = Arc::new(Mutex::new(Vec::new()));
    g.create_node(
        "c1",
        Collect { edge: edge.clone(), id: None, out: c1_out.clone(), delay: Duration::from_millis(1) },
        vec![e],
        vec![],
    )
    .unwrap();
    g.create_node(
        "c2",
        Collect { edge: edge.clone(), id: None, out: c2_out.clone(), delay: Duration::from_millis(2) },
        vec![e],
        vec![],
    )
    .unwrap();

    g.init().unwrap();

    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    while (c1_out.lock().unwrap().len() < 10 || c2_out.lock().unwrap().len() < 10) && std::time::Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
    }

    g.deinit().unwrap();

    let c1 = c1_out.lock().unwrap();
    let c2 = c2_out.lock().unwrap();
    assert!(c1.len() >= 10 && c2.len() >= 10);
    assert_eq!(&c1[..10], (0..10).collect::<Vec<_>>().as_slice());
    assert_eq!(&c2[..10], (0..10).collect::<Vec<_>>().as_slice());
}

#[test]
fn termination_unblocks_a_consumer_with_no_producer_writes() {
    let g = Graph::new("terminate-only");
    g.set_parallel_type(ParallelMode::Pipeline);

    let e = g.create_edge("items").unwrap();
    let edge = g.edge_handle(e);
    struct NeverProduces;
    impl Node for NeverProduces {
        fn run(&mut self) -> Result<()> {
            std::thread::sleep(Duration::from_millis(50));
            Ok(())
        }
    }
    g.create_node("silent_producer", NeverProduces, vec![], vec![e]).unwrap();

    let collected = Arc::new(Mutex::new(Vec::new()));
    g.create_node(
        "consumer",
        Collect { edge: edge.clone(), id: None, out: collected.clone(), delay: Duration::from_millis(1) },
        vec![e],
        vec![],
    )
    .unwrap();

    g.init().unwrap();
    std::thread::sleep(Duration::from_millis(20));
    edge.request_terminate();
    g.deinit().unwrap();

    assert!(collected.lock().unwrap().is_empty());
}
