#[cfg(test)]
mod profile_pipelines {
    use std::fs;
    use std::io::Write;
    use std::path::{Path, PathBuf};

    use simlog::{blockchain, cache, gossip, multicast};

    fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = fs::File::create(&path).unwrap();
        write!(file, "{}", content).unwrap();
        path
    }

    /// End-to-end gossip run: two nodes, events spread over several
    /// seconds, one reconnect.
    #[test]
    fn test_gossip_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let log = concat!(
            "2.5 127.0.0.1 alpha 9000\n0.0\n0\n",
            "2.8 127.0.0.1 beta 9001\n0.0\n0\n",
            "3.2 alpha m1\n0.10\n120\n",
            "3.9 beta m1\n0.30\n120\n",
            "7.1 alpha m2\n0.20\n80\n",
        );
        let path = write_file(dir.path(), "run.txt", log);

        let report = gossip::analyze(&path).unwrap();
        assert_eq!(report.records, 5);
        assert_eq!(report.connections, 2);
        assert_eq!(report.events, 3);

        // Seconds 2 through 7 inclusive.
        assert_eq!(report.delay.origin, 2);
        assert_eq!(report.delay.len(), 6);
        // Second 3 holds both events; seconds 4-6 are empty.
        assert_eq!(report.bandwidth.buckets[1].sum, 240.0);
        assert_eq!(report.bandwidth.buckets[2].count, 0);
        assert_eq!(report.bandwidth.buckets[2].sum, 0.0);
        assert_eq!(report.bandwidth.buckets[5].sum, 80.0);

        assert_eq!(report.nodes.len(), 2);
        let alpha = report.nodes.iter().find(|n| n.node == "alpha").unwrap();
        assert_eq!(alpha.delays, vec![0.10, 0.20]);
        assert_eq!(alpha.total_bandwidth, 200);
        let beta = report.nodes.iter().find(|n| n.node == "beta").unwrap();
        assert_eq!(beta.samples, 1);

        // Connection records count toward the overall distribution.
        assert_eq!(report.overall_delay.count, 5);
        assert_eq!(report.overall_delay.min, 0.0);
        assert_eq!(report.overall_delay.max, 0.30);
    }

    /// An event naming a node that never connected points at its line.
    #[test]
    fn test_gossip_unknown_node() {
        let dir = tempfile::tempdir().unwrap();
        let log = "0.0 127.0.0.1 alpha 9000\n0.1\n5\n1.0 ghost m1\n0.2\n10\n";
        let path = write_file(dir.path(), "run.txt", log);

        let err = gossip::analyze(&path).unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.contains("ghost"), "unexpected error: {}", message);
        assert!(message.contains("line 4"), "unexpected error: {}", message);
    }

    #[test]
    fn test_gossip_empty_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "run.txt", "");
        let err = gossip::analyze(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("no samples"));
    }

    /// End-to-end multicast run: three nodes, uneven run lengths, one
    /// message lost to a failed node.
    #[test]
    fn test_multicast_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "bandwidth1.txt", "0.0 100.0\n1.2 60.0\n1.8 40.0\n");
        write_file(dir.path(), "bandwidth2.txt", "5.0 30.0\n7.5 10.0\n");
        write_file(dir.path(), "bandwidth3.txt", "0.5 20.0\n");
        write_file(
            dir.path(),
            "log1.txt",
            "1.0 FirstMessage node1 1 hello\n4.0 FirstMessage node1 2 again\n",
        );
        write_file(
            dir.path(),
            "log2.txt",
            "1.4 Message node1 1\n2.2 Message node1 1\n",
        );
        write_file(dir.path(), "log3.txt", "1.9 Message node1 1\n");

        let report = multicast::analyze(dir.path(), Some(3)).unwrap();
        assert_eq!(report.nodes, 3);
        assert_eq!(report.records, 11);

        // Node 2 spans seconds 5..=7 of its own clock, the longest run.
        assert_eq!(report.seconds, 3);
        assert_eq!(report.node_bandwidth[0].per_second, vec![100.0, 100.0, 0.0]);
        assert_eq!(report.node_bandwidth[1].per_second, vec![30.0, 0.0, 10.0]);
        assert_eq!(report.node_bandwidth[2].per_second, vec![20.0, 0.0, 0.0]);

        // node1:1 completed with last delivery at 2.2; node1:2 never
        // got delivered anywhere.
        assert_eq!(report.delivered_messages, 1);
        assert_eq!(report.incomplete_messages, 1);
        assert_eq!(report.spreads, vec![2.2 - 1.0]);
        let spread = report.spread.unwrap();
        assert_eq!(spread.count, 1);
        assert!((spread.max - 1.2).abs() < 1e-9);
    }

    #[test]
    fn test_multicast_node_count_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "bandwidth1.txt", "0.0 1.0\n");
        write_file(dir.path(), "log1.txt", "");
        let err = multicast::analyze(dir.path(), Some(2)).unwrap_err();
        assert!(format!("{:#}", err).contains("Expected 2"));
    }

    /// End-to-end blockchain run covering every record kind.
    #[test]
    fn test_blockchain_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let log = concat!(
            "B 0.2 500\n",
            "B 2.9 250\n",
            "T node1 5.0 TRANSACTION 2.0\n",
            "T node2 6.0 TRANSACTION 2.0\n",
            "T node3 6.5 TRANSACTION 2.0\n",
            "T node1 11.0 TRANSACTION 10.0\n",
            "BLK node1 6.0 aaa\n",
            "BLK node2 6.4 aaa\n",
            "BLK node3 7.0 aaa\n",
            "BLK node1 9.0 bbb\n",
            "TB node1 12.0 2.0\n",
            "TB node2 13.5 2.0\n",
            "CS node1 3.0 2 aaa bbb\n",
            "CS node2 3.0 4 aaa ccc\n",
            "garbage line from another tool\n",
        );
        let path = write_file(dir.path(), "run.txt", log);

        let report = blockchain::analyze(&path, false).unwrap();
        assert_eq!(report.records, 14);
        assert_eq!(report.skipped_lines, 1);

        let bandwidth = report.bandwidth.as_ref().unwrap();
        assert_eq!(bandwidth.len(), 3);
        assert_eq!(bandwidth.sums(), vec![500.0, 0.0, 250.0]);

        // tx "2.0": delays 3.0/4.0/4.5 at three nodes; tx "10.0": one
        // receipt. Create times rebase onto the earlier transaction.
        assert_eq!(report.transactions.len(), 2);
        assert_eq!(report.transactions[0].max_delay, 4.5);
        assert_eq!(report.transactions[0].receive_count, 3);
        assert_eq!(report.transactions[0].create_time, 0.0);
        assert_eq!(report.transactions[1].create_time, 8.0);
        assert_eq!(report.distinct_receive_counts, vec![1, 3]);

        // Block aaa spreads over a second; bbb was seen once.
        assert_eq!(report.chain.unique_blocks, 2);
        assert_eq!(report.chain.block_receipts, 4);
        assert_eq!(report.blocks[0].hash, "aaa");
        assert!((report.blocks[0].propagation_delay - 1.0).abs() < 1e-9);

        // Duplicate split timestamp keeps one row with the later length.
        assert_eq!(report.chain.chain_splits, 1);
        assert_eq!(report.chain.max_split_length, 4);
        assert!((report.chain.split_ratio - 0.25).abs() < 1e-12);

        let inclusion = report.inclusion_delay.as_ref().unwrap();
        assert_eq!(inclusion.count, 1);
        assert_eq!(inclusion.max, 11.5);
    }

    /// The same log analyzed twice produces byte-identical results.
    #[test]
    fn test_blockchain_analysis_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let log = concat!(
            "T node1 5.0 TRANSACTION 2.0\n",
            "T node2 6.0 TRANSACTION 2.0\n",
            "T node1 4.0 TRANSACTION 1.5\n",
            "BLK node1 6.0 aaa\n",
            "BLK node2 5.0 bbb\n",
        );
        let path = write_file(dir.path(), "run.txt", log);

        let first = blockchain::analyze(&path, false).unwrap();
        let second = blockchain::analyze(&path, false).unwrap();
        assert_eq!(
            serde_json::to_value(&first).unwrap(),
            serde_json::to_value(&second).unwrap()
        );
    }

    #[test]
    fn test_blockchain_empty_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "run.txt", "");
        let err = blockchain::analyze(&path, false).unwrap_err();
        assert!(format!("{:#}", err).contains("blockchain log"));
    }

    /// First cached run writes the sidecar; a second run reads it back
    /// to the same report; regenerating the log invalidates it.
    #[test]
    fn test_blockchain_record_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "run.txt", "B 1.0 300\nBLK node1 2.0 aaa\n");

        let first = blockchain::analyze(&path, true).unwrap();
        let sidecar = cache::cache_path(&path);
        assert!(sidecar.exists(), "cache file not written");

        let second = blockchain::analyze(&path, true).unwrap();
        assert_eq!(
            serde_json::to_value(&first).unwrap(),
            serde_json::to_value(&second).unwrap()
        );

        // Regenerate the log with more records; the stale cache must
        // not mask them.
        write_file(
            dir.path(),
            "run.txt",
            "B 1.0 300\nBLK node1 2.0 aaa\nBLK node2 3.0 aaa\n",
        );
        let third = blockchain::analyze(&path, true).unwrap();
        assert_eq!(third.records, 3);
        assert_eq!(third.chain.block_receipts, 2);
    }

    /// A corrupt cache is ignored, not fatal.
    #[test]
    fn test_blockchain_corrupt_cache_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "run.txt", "B 1.0 300\n");
        fs::write(cache::cache_path(&path), b"junk").unwrap();

        let report = blockchain::analyze(&path, true).unwrap();
        assert_eq!(report.records, 1);
    }
}
