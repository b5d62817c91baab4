use std::collections::HashSet;

use blake3::hash;
use memgoal::trace::{parse_trace, render_report, TraceReplay};
use memgoal::ProbeConfig;

const TRACE: &str = "\
arm Map.insert()
exec Map.insert()
new bucket 256
new entry 48
new a 16
free a
ret Map.insert()
check Map.insert() 300
arm Map.rehash()
exec Map.rehash()
new table 1024
free bucket
ret Map.rehash()
check Map.rehash() 512
";

#[test]
fn trace_replay_is_deterministic() {
    let lines = parse_trace(TRACE).expect("trace parses");

    let mut fingerprints = HashSet::new();
    for _ in 0..5 {
        let config = ProbeConfig::default().with_growth_profiling(true);
        let report = TraceReplay::new(config)
            .run(&lines)
            .expect("replay succeeds");
        let rendered = render_report(&report).expect("rendering succeeds");
        fingerprints.insert(hash(rendered.as_bytes()));
    }

    assert_eq!(fingerprints.len(), 1, "outputs diverged across runs");
}
