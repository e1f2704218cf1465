//! Scenarios S2/S3 from spec.md §8: a diamond `A -> B, A -> C, B -> D, C -> D`
//! on the parallel-task engine.

use rayshape_kernel::node::Node;
use rayshape_kernel::{Error, Graph, ParallelMode, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

struct Recording {
    tag: &'static str,
    order: Arc<Mutex<Vec<&'static str>>>,
}
impl Node for Recording {
    fn run(&mut self) -> Result<()> {
        std::thread::sleep(Duration::from_millis(10));
        self.order.lock().unwrap().push(self.tag);
        Ok(())
    }
}

#[test]
fn diamond_respects_happens_before_and_succeeds() {
    let g = Graph::new("s2");
    g.set_parallel_type(ParallelMode::Task);

    let order = Arc::new(Mutex::new(Vec::new()));
    let ab = g.create_edge("ab").unwrap();
    let ac = g.create_edge("ac").unwrap();
    let bd = g.create_edge("bd").unwrap();
    let cd = g.create_edge("cd").unwrap();

    g.create_node("a", Recording { tag: "A", order: order.clone() }, vec![], vec![ab, ac]).unwrap();
    g.create_node("b", Recording { tag: "B", order: order.clone() }, vec![ab], vec![bd]).unwrap();
    g.create_node("c", Recording { tag: "C", order: order.clone() }, vec![ac], vec![cd]).unwrap();
    g.create_node("d", Recording { tag: "D", order: order.clone() }, vec![bd, cd], vec![]).unwrap();

    g.init().unwrap();
    g.run().unwrap();
    g.deinit().unwrap();

    let observed = order.lock().unwrap().clone();
    assert_eq!(observed.len(), 4);
    assert_eq!(observed[0], "A");
    assert_eq!(observed[3], "D");
    let middle: std::collections::HashSet<_> = observed[1..3].iter().copied().collect();
    assert_eq!(middle, std::collections::HashSet::from(["B", "C"]));
}

struct FailsOnNthRun {
    tag: &'static str,
    order: Arc<Mutex<Vec<&'static str>>>,
    run_count: Arc<AtomicUsize>,
    fail_on: usize,
}
impl Node for FailsOnNthRun {
    fn run(&mut self) -> Result<()> {
        let n = self.run_count.fetch_add(1, Ordering::SeqCst) + 1;
        if n == self.fail_on {
            return Err(Error::InvalidState(format!("{} failed on run {n}", self.tag)));
        }
        self.order.lock().unwrap().push(self.tag);
        Ok(())
    }
}

#[test]
fn node_error_is_returned_and_stops_successors() {
    let g = Graph::new("s3");
    g.set_parallel_type(ParallelMode::Task);

    let order = Arc::new(Mutex::new(Vec::new()));
    let ab = g.create_edge("ab").unwrap();
    let ac = g.create_edge("ac").unwrap();
    let bd = g.create_edge("bd").unwrap();
    let cd = g.create_edge("cd").unwrap();

    g.create_node("a", Recording { tag: "A", order: order.clone() }, vec![], vec![ab, ac]).unwrap();
    g.create_node("b", Recording { tag: "B", order: order.clone() }, vec![ab], vec![bd]).unwrap();
    g.create_node(
        "c",
        FailsOnNthRun { tag: "C", order: order.clone(), run_count: Arc::new(AtomicUsize::new(0)), fail_on: 1 },
        vec![ac],
        vec![cd],
    )
    .unwrap();
    let d_ran = Arc::new(AtomicUsize::new(0));
    struct CountingD(Arc<AtomicUsize>);
    impl Node for CountingD {
        fn run(&mut self) -> Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }
    g.create_node("d", CountingD(d_ran.clone()), vec![bd, cd], vec![]).unwrap();

    g.init().unwrap();
    let err = g.run().unwrap_err();
    assert!(matches!(err, Error::NodeExecutionFailed(_, _)));
    g.deinit().unwrap();

    // D depends on C, which never completed successfully; D must not run.
    assert_eq!(d_ran.load(Ordering::SeqCst), 0);
    assert!(order.lock().unwrap().contains(&"A"));
}
