//! Scanning must not depend on how the input is split into reads.

mod common;

use std::io::{self, Read};

use common::{Files, Outcome, scan_source};
use rand::{
    Rng, SeedableRng,
    distr::{Alphanumeric, SampleString},
    rngs::StdRng,
};
use xscan::{config::XmlScanConfig, io::XmlInputSource};

/// Hands out the bytes of a document in reads of random length.
struct RandomChunks {
    bytes: Vec<u8>,
    position: usize,
    rng: StdRng,
    max: usize,
}

impl Read for RandomChunks {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let rest = self.bytes.len() - self.position;
        if rest == 0 || buf.is_empty() {
            return Ok(0);
        }
        let len = self.rng.random_range(1..=self.max).min(rest).min(buf.len());
        buf[..len].copy_from_slice(&self.bytes[self.position..self.position + len]);
        self.position += len;
        Ok(len)
    }
}

fn small_buffers() -> XmlScanConfig {
    XmlScanConfig {
        buffer_size: 64,
        continue_after_fatal_error: true,
        ..Default::default()
    }
}

fn scan_chunked(doc: &[u8], seed: u64, max: usize, files: &Files) -> Outcome {
    let reader = RandomChunks {
        bytes: doc.to_vec(),
        position: 0,
        rng: StdRng::seed_from_u64(seed),
        max,
    };
    scan_source(
        XmlInputSource::from_reader(Some("doc.xml"), reader),
        small_buffers(),
        files.clone(),
        false,
    )
}

fn scan_whole(doc: &[u8], files: &Files) -> Outcome {
    scan_source(
        XmlInputSource::from_bytes(Some("doc.xml"), doc.to_vec()),
        small_buffers(),
        files.clone(),
        false,
    )
}

const DOCUMENT: &str = concat!(
    "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\r\n",
    "<!DOCTYPE doc [\r\n",
    "  <!ENTITY greeting 'h\u{e9}llo &amp; w\u{f6}rld'>\r\n",
    "  <!ENTITY ext SYSTEM 'ext.xml'>\r\n",
    "]>\r\n",
    "<!-- \u{65e5}\u{672c}\u{8a9e} comment -->\r\n",
    "<doc xmlns:p='urn:p' p:attr='a&#x20AC;b' other=\"&greeting;\">\r\n",
    "  <p:item n='1'>&greeting; \u{1f600} text\r\n   over lines</p:item>\r\n",
    "  <![CDATA[ <raw> & ]] ]]>\r\n",
    "  <?target some data \u{3042}?>\r\n",
    "  &ext;\r\n",
    "  <empty/>&#65;&#x1F600;&lt;&gt;&quot;&apos;\r\n",
    "</doc>\r\n",
);

fn external() -> Files {
    Files::default().with(
        "ext.xml",
        "<?xml encoding='UTF-8'?><e>\u{e9}x\u{2764}ternal</e>",
    )
}

#[test]
fn random_splits_give_identical_events() {
    let files = external();
    let whole = scan_whole(DOCUMENT.as_bytes(), &files);
    assert!(whole.well_formed, "{:?}", whole.errors);
    assert!(whole.errors.is_empty(), "{:?}", whole.errors);

    for seed in 0..32 {
        for max in [1, 2, 3, 7, 64] {
            let chunked = scan_chunked(DOCUMENT.as_bytes(), seed, max, &files);
            assert_eq!(chunked.events, whole.events, "seed {seed}, reads of at most {max}");
            assert_eq!(chunked.errors, whole.errors, "seed {seed}, reads of at most {max}");
        }
    }
}

#[test]
fn errors_do_not_depend_on_splits() {
    let doc = "<r>\u{e9}t\u{e9} ]]> <a b='<'/>&#xD800;</x>";
    let files = Files::default();
    let whole = scan_whole(doc.as_bytes(), &files);
    assert!(!whole.errors.is_empty());
    for seed in 0..16 {
        let chunked = scan_chunked(doc.as_bytes(), seed, 3, &files);
        assert_eq!(chunked.events, whole.events, "seed {seed}");
        assert_eq!(chunked.errors, whole.errors, "seed {seed}");
    }
}

/// A random tree of elements with text between them.
fn random_document(rng: &mut StdRng) -> (String, String) {
    fn element(rng: &mut StdRng, depth: usize, doc: &mut String, text: &mut String) {
        let name = format!("e{}", Alphanumeric.sample_string(rng, 4));
        doc.push_str(&format!("<{name}>"));
        let children = if depth < 4 { rng.random_range(0..4) } else { 0 };
        for _ in 0..children {
            let len = rng.random_range(0..40);
            let run = Alphanumeric.sample_string(rng, len);
            doc.push_str(&run);
            text.push_str(&run);
            element(rng, depth + 1, doc, text);
        }
        let len = rng.random_range(0..40);
        let run = Alphanumeric.sample_string(rng, len);
        doc.push_str(&run);
        text.push_str(&run);
        doc.push_str(&format!("</{name}>"));
    }

    let mut doc = String::new();
    let mut text = String::new();
    element(rng, 0, &mut doc, &mut text);
    (doc, text)
}

#[test]
fn random_documents_keep_their_text() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    for round in 0..20 {
        let (doc, text) = random_document(&mut rng);
        let chunked = scan_chunked(doc.as_bytes(), round, 5, &Files::default());
        assert!(chunked.errors.is_empty(), "{:?}", chunked.errors);
        let scanned = chunked
            .events
            .iter()
            .filter_map(|e| e.strip_prefix("chars(")?.strip_suffix(')'))
            .collect::<String>();
        assert_eq!(scanned, text, "{doc}");
    }
}
