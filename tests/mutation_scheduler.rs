//  ██████╗  █████╗ ███████╗███████╗██╗███╗   ██╗ ██████╗
//  ██╔══██╗██╔══██╗██╔════╝██╔════╝██║████╗  ██║██╔════╝
//  ██████╔╝███████║███████╗███████╗██║██╔██╗ ██║██║  ███╗
//  ██╔═══╝ ██╔══██║╚════██║╚════██║██║██║╚██╗██║██║   ██║
//  ██║     ██║  ██║███████║███████║██║██║ ╚████║╚██████╔╝
//  ╚═╝     ╚═╝  ╚═╝╚══════╝╚══════╝╚═╝╚═╝  ╚═══╝ ╚═════╝

mod common;

const COMMENT_FRAGMENT: &str =
    "<div class=\"talkback-item\"><pre class=\"comment-item-text\">late\u{200B}</pre></div>";

#[cfg(test)]
mod passing {
    use std::rc::Rc;
    use std::time::Duration;

    use tokio::sync::mpsc;

    use talkback_cleaner::core::init;
    use talkback_cleaner::parsers::html::{get_node_name, has_class, html_to_dom, text_content};
    use talkback_cleaner::parsers::{append_fragment, Selector};
    use talkback_cleaner::pipeline::{select_root, MutationRecord};

    use super::COMMENT_FRAGMENT;
    use crate::common::{build_page, comment_nodes, first_match, quiet_options, ITEM_URL};

    #[test]
    fn burst_within_one_frame_runs_one_pass() {
        let dom = build_page(&["first"]);
        let mut cleaner = init(&dom.document, ITEM_URL, &quiet_options())
            .unwrap()
            .unwrap();
        let list = first_match(&dom, ".talkback-list");

        let mut frames_requested = 0;
        for _ in 0..25 {
            append_fragment(&list, COMMENT_FRAGMENT).unwrap();
            if cleaner.notify(&[MutationRecord::added(&list)]) {
                frames_requested += 1;
            }
        }
        assert_eq!(frames_requested, 1);
        assert!(cleaner.scheduler().is_batch_pending());

        let stats = cleaner.run_pending().unwrap().unwrap();
        assert!(!cleaner.scheduler().is_batch_pending());
        assert!(cleaner.run_pending().is_none());

        let report = cleaner.scheduler().report();
        assert_eq!(report.records_seen, 25);
        assert_eq!(report.frames_requested, 1);
        assert_eq!(report.passes_run, 1);
        assert_eq!(stats.nodes_processed, 26);
        assert_eq!(stats.invisible_chars_removed, 25);
    }

    #[test]
    fn next_burst_after_a_frame_schedules_again() {
        let dom = build_page(&["first"]);
        let mut cleaner = init(&dom.document, ITEM_URL, &quiet_options())
            .unwrap()
            .unwrap();
        let list = first_match(&dom, ".talkback-list");

        assert!(cleaner.notify(&[MutationRecord::added(&list)]));
        cleaner.run_pending();
        assert!(cleaner.notify(&[MutationRecord::removed(&list)]));
        cleaner.run_pending();

        assert_eq!(cleaner.scheduler().report().passes_run, 2);
    }

    #[test]
    fn records_outside_the_root_are_ignored() {
        let dom = build_page(&["first"]);
        let mut cleaner = init(&dom.document, ITEM_URL, &quiet_options())
            .unwrap()
            .unwrap();
        let head = first_match(&dom, "head");

        assert!(!cleaner.notify(&[MutationRecord::added(&head)]));
        assert!(!cleaner.scheduler().is_batch_pending());
        assert_eq!(cleaner.scheduler().report().records_seen, 0);
    }

    #[test]
    fn root_prefers_most_specific_container() {
        let selectors: Vec<Selector> = [".talkback-list-wrapper", ".talkback-list", "body"]
            .iter()
            .map(|s| Selector::parse(s).unwrap())
            .collect();

        let dom = build_page(&[]);
        assert!(has_class(&select_root(&dom.document, &selectors), "talkback-list-wrapper"));

        let dom = html_to_dom(b"<body><div class=\"talkback-list\"></div></body>", "utf-8").unwrap();
        assert!(has_class(&select_root(&dom.document, &selectors), "talkback-list"));

        let dom = html_to_dom(b"<body><p>no comments</p></body>", "utf-8").unwrap();
        assert_eq!(get_node_name(&select_root(&dom.document, &selectors)), Some("body"));

        let dom = html_to_dom(b"<p>no comments</p>", "utf-8").unwrap();
        let none: Vec<Selector> = vec![Selector::parse("#missing").unwrap()];
        assert!(Rc::ptr_eq(&select_root(&dom.document, &none), &dom.document));
    }

    #[tokio::test(start_paused = true)]
    async fn async_driver_coalesces_a_burst() {
        let dom = build_page(&["first"]);
        let mut cleaner = init(&dom.document, ITEM_URL, &quiet_options())
            .unwrap()
            .unwrap();
        let list = first_match(&dom, ".talkback-list");

        let (tx, rx) = mpsc::unbounded_channel();
        for _ in 0..10 {
            append_fragment(&list, COMMENT_FRAGMENT).unwrap();
            tx.send(vec![MutationRecord::added(&list)]).unwrap();
        }
        drop(tx);

        let report = cleaner.observe(rx).await;

        assert_eq!(report.records_seen, 10);
        assert_eq!(report.passes_run, 1);
        assert_eq!(report.passes_failed, 0);
        assert_eq!(cleaner.statistics().nodes_processed, 11);
        assert!(comment_nodes(&dom)
            .iter()
            .skip(1)
            .all(|node| text_content(node) == "late"));
    }

    #[tokio::test(start_paused = true)]
    async fn async_driver_runs_once_per_frame() {
        let dom = build_page(&["first"]);
        let mut cleaner = init(&dom.document, ITEM_URL, &quiet_options())
            .unwrap()
            .unwrap();
        let list = first_match(&dom, ".talkback-list");
        let root = list.clone();

        let (tx, rx) = mpsc::unbounded_channel();
        let feeder = async move {
            for _ in 0..3 {
                append_fragment(&root, COMMENT_FRAGMENT).unwrap();
                tx.send(vec![MutationRecord::added(&root)]).unwrap();
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        };

        let ((), report) = tokio::join!(feeder, cleaner.observe(rx));

        assert_eq!(report.records_seen, 3);
        assert_eq!(report.passes_run, 3);
        assert_eq!(cleaner.statistics().nodes_processed, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn burst_after_idle_gap_waits_for_next_frame() {
        let dom = build_page(&["first"]);
        let mut cleaner = init(&dom.document, ITEM_URL, &quiet_options())
            .unwrap()
            .unwrap();
        let list = first_match(&dom, ".talkback-list");
        let root = list.clone();

        let (tx, rx) = mpsc::unbounded_channel();
        let feeder = async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            for _ in 0..5 {
                append_fragment(&root, COMMENT_FRAGMENT).unwrap();
                tx.send(vec![MutationRecord::added(&root)]).unwrap();
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
            // 下一帧早已结束，这条记录单独成批
            tokio::time::sleep(Duration::from_millis(100)).await;
            append_fragment(&root, COMMENT_FRAGMENT).unwrap();
            tx.send(vec![MutationRecord::added(&root)]).unwrap();
        };

        let ((), report) = tokio::join!(feeder, cleaner.observe(rx));

        assert_eq!(report.records_seen, 6);
        assert_eq!(report.frames_requested, 2);
        assert_eq!(report.passes_run, 2);
        assert_eq!(report.passes_failed, 0);
        assert_eq!(cleaner.statistics().nodes_processed, 7);
    }
}

//  ███████╗ █████╗ ██╗██╗     ██╗███╗   ██╗ ██████╗
//  ██╔════╝██╔══██╗██║██║     ██║████╗  ██║██╔════╝
//  █████╗  ███████║██║██║     ██║██╔██╗ ██║██║  ███╗
//  ██╔══╝  ██╔══██║██║██║     ██║██║╚██╗██║██║   ██║
//  ██║     ██║  ██║██║███████╗██║██║ ╚████║╚██████╔╝
//  ╚═╝     ╚═╝  ╚═╝╚═╝╚══════╝╚═╝╚═╝  ╚═══╝ ╚═════╝

#[cfg(test)]
mod failing {
    use std::cell::Cell;
    use std::rc::Rc;

    use markup5ever_rcdom::Handle;

    use talkback_cleaner::core::{CleanerError, CleanerResult, LogLevel};
    use talkback_cleaner::parsers::html::{find_all, text_content};
    use talkback_cleaner::parsers::{append_fragment, Selector};
    use talkback_cleaner::pipeline::{
        BatchProcessor, CandidateSource, Labels, MutationRecord, MutationScheduler,
        PreviewRenderer, TextCleaner,
    };

    use super::COMMENT_FRAGMENT;
    use crate::common::{build_page, first_match, ITEM_URL};

    /// 第一次调用失败，之后正常返回候选节点
    struct FlakySource {
        document: Handle,
        calls: Rc<Cell<usize>>,
    }

    impl CandidateSource for FlakySource {
        fn candidates(&self) -> CleanerResult<Vec<Handle>> {
            self.calls.set(self.calls.get() + 1);
            if self.calls.get() == 1 {
                return Err(CleanerError::DomWrite("host rejected the scan".to_string()));
            }
            Ok(find_all(
                &self.document,
                &Selector::parse("pre.comment-item-text").unwrap(),
            ))
        }
    }

    #[test]
    fn failed_pass_keeps_observer_alive() {
        let dom = build_page(&["first\u{200B}"]);
        let list = first_match(&dom, ".talkback-list");
        let calls = Rc::new(Cell::new(0));
        let mut processor = BatchProcessor::new(
            Box::new(FlakySource {
                document: dom.document.clone(),
                calls: calls.clone(),
            }),
            TextCleaner::default(),
            PreviewRenderer::new(5, Labels::english()),
            LogLevel::Off,
            ITEM_URL,
        );
        let mut scheduler = MutationScheduler::new(list.clone());

        assert!(scheduler.notify(&[MutationRecord::added(&list)]));
        let failed = scheduler.run_pending(&mut processor).unwrap();
        assert!(failed.is_err());
        assert!(!scheduler.is_batch_pending());

        append_fragment(&list, COMMENT_FRAGMENT).unwrap();
        assert!(scheduler.notify(&[MutationRecord::added(&list)]));
        let stats = scheduler.run_pending(&mut processor).unwrap().unwrap();

        assert_eq!(stats.nodes_processed, 2);
        assert_eq!(scheduler.report().passes_run, 2);
        assert_eq!(scheduler.report().passes_failed, 1);
        assert_eq!(calls.get(), 2);
        assert_eq!(text_content(&list), "firstlate");
    }

    #[test]
    fn dropped_targets_are_ignored() {
        let dom = build_page(&["first"]);
        let list = first_match(&dom, ".talkback-list");
        let mut scheduler = MutationScheduler::new(list);

        let record = {
            let orphan = talkback_cleaner::parsers::html::create_element("div", &[]);
            MutationRecord::added(&orphan)
        };

        assert!(!scheduler.notify(&[record]));
        assert_eq!(scheduler.report().records_seen, 0);
    }
}
