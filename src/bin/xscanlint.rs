//! Scan XML files and print the events the scanner reports.

use std::{
    fs::File,
    io::{self, Read, Write, stdin, stdout},
    process::ExitCode,
};

use anyhow::{Context, Result};
use clap::Parser;
use xscan::{
    config::XmlScanConfig,
    error::XmlScanError,
    globals::{get_scanner_version, set_debug_entities},
    io::{XmlInputSource, XmlResourceIdentifier},
    parser::{QName, XmlAttributes, XmlDocumentHandler, XmlDocumentScanner, XmlString},
};

#[derive(clap::Parser, Debug)]
#[command(
    version,
    name = "xscanlint",
    arg_required_else_help = true,
    about = "Scan the XML files and print the events of the scanner."
)]
struct CmdArgs {
    #[clap(required = true)]
    xml_files: Vec<String>,
    /// scan the files as external parsed entities
    #[arg(long)]
    fragment: bool,
    /// do not check names against the namespace rules
    #[arg(long)]
    no_namespaces: bool,
    /// report character references as entities
    #[arg(long)]
    notify_char_refs: bool,
    /// report references to the predefined entities as entities
    #[arg(long)]
    notify_builtin_refs: bool,
    /// keep scanning after a fatal error
    #[arg(long = "continue")]
    continue_after_fatal_error: bool,
    /// do not load the external DTD subset
    #[arg(long)]
    no_external_dtd: bool,
    /// limit the number of entity expansions per document
    #[arg(long, value_name = "N")]
    expansion_limit: Option<usize>,
    /// size of the buffer external entities are read into
    #[arg(long, value_name = "N")]
    buffer_size: Option<usize>,
    /// read the files in chunks of at most N bytes
    #[arg(long, value_name = "N")]
    chunk: Option<usize>,
    /// drive the scanner one step at a time
    #[arg(long)]
    step: bool,
    /// trace the start and end of every entity
    #[arg(long)]
    debug_entities: bool,
    /// do not print the events
    #[arg(long)]
    quiet: bool,
}

impl CmdArgs {
    fn config(&self) -> Result<XmlScanConfig> {
        let mut config = XmlScanConfig {
            namespaces: !self.no_namespaces,
            notify_char_refs: self.notify_char_refs,
            notify_builtin_refs: self.notify_builtin_refs,
            continue_after_fatal_error: self.continue_after_fatal_error,
            load_external_dtd: !self.no_external_dtd,
            entity_expansion_limit: self.expansion_limit,
            ..Default::default()
        };
        if let Some(size) = self.buffer_size {
            config.set_property(xscan::config::BUFFER_SIZE, size)?;
        }
        Ok(config)
    }
}

/// A reader returning at most `chunk` bytes per read.
struct ChunkedReader<R> {
    inner: R,
    chunk: usize,
}

impl<R: Read> Read for ChunkedReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let len = buf.len().min(self.chunk);
        self.inner.read(&mut buf[..len])
    }
}

/// Prints each event on its own line.
struct EventPrinter<W: Write> {
    out: W,
}

impl<W: Write> EventPrinter<W> {
    fn print(&mut self, line: std::fmt::Arguments) {
        // a closed stdout is not worth aborting the scan for
        writeln!(self.out, "{line}").ok();
    }
}

fn escape(text: &str) -> String {
    text.chars()
        .flat_map(|c| match c {
            '\n' => vec!['\\', 'n'],
            '\r' => vec!['\\', 'r'],
            '\t' => vec!['\\', 't'],
            c => vec![c],
        })
        .collect()
}

impl<W: Write> XmlDocumentHandler for EventPrinter<W> {
    fn start_document(&mut self, encoding: Option<&str>) {
        self.print(format_args!(
            "startDocument encoding={}",
            encoding.unwrap_or("-")
        ));
    }

    fn xml_decl(&mut self, version: Option<&str>, encoding: Option<&str>, standalone: Option<&str>) {
        self.print(format_args!(
            "xmlDecl version={} encoding={} standalone={}",
            version.unwrap_or("-"),
            encoding.unwrap_or("-"),
            standalone.unwrap_or("-")
        ));
    }

    fn text_decl(&mut self, version: Option<&str>, encoding: Option<&str>) {
        self.print(format_args!(
            "textDecl version={} encoding={}",
            version.unwrap_or("-"),
            encoding.unwrap_or("-")
        ));
    }

    fn doctype_decl(&mut self, root: &str, public_id: Option<&str>, system_id: Option<&str>) {
        self.print(format_args!(
            "doctypeDecl {root} public={} system={}",
            public_id.unwrap_or("-"),
            system_id.unwrap_or("-")
        ));
    }

    fn start_general_entity(
        &mut self,
        name: &str,
        identifier: Option<&XmlResourceIdentifier>,
        encoding: Option<&str>,
    ) {
        let system_id = identifier
            .and_then(|id| id.expanded_system_id.as_deref())
            .unwrap_or("-");
        self.print(format_args!(
            "startEntity {name} system={system_id} encoding={}",
            encoding.unwrap_or("-")
        ));
    }

    fn end_general_entity(&mut self, name: &str) {
        self.print(format_args!("endEntity {name}"));
    }

    fn comment(&mut self, text: XmlString<'_>) {
        self.print(format_args!("comment {}", escape(&text.to_string())));
    }

    fn processing_instruction(&mut self, target: &str, data: XmlString<'_>) {
        self.print(format_args!("pi {target} {}", escape(&data.to_string())));
    }

    fn start_element(&mut self, element: &QName, attributes: &XmlAttributes) {
        let mut line = format!("startElement {}", element.rawname());
        for attr in attributes.iter() {
            line.push_str(&format!(" {}=\"{}\"", attr.name.rawname(), escape(&attr.value)));
        }
        self.print(format_args!("{line}"));
    }

    fn empty_element(&mut self, element: &QName, attributes: &XmlAttributes) {
        let mut line = format!("emptyElement {}", element.rawname());
        for attr in attributes.iter() {
            line.push_str(&format!(" {}=\"{}\"", attr.name.rawname(), escape(&attr.value)));
        }
        self.print(format_args!("{line}"));
    }

    fn end_element(&mut self, element: &QName) {
        self.print(format_args!("endElement {}", element.rawname()));
    }

    fn characters(&mut self, text: XmlString<'_>) {
        self.print(format_args!("characters {}", escape(&text.to_string())));
    }

    fn start_cdata(&mut self) {
        self.print(format_args!("startCDATA"));
    }

    fn end_cdata(&mut self) {
        self.print(format_args!("endCDATA"));
    }

    fn end_document(&mut self) {
        self.print(format_args!("endDocument"));
    }
}

fn open_input(args: &CmdArgs, path: &str) -> Result<XmlInputSource> {
    let reader: Box<dyn Read> = if path == "-" {
        Box::new(stdin())
    } else {
        Box::new(File::open(path).with_context(|| format!("failed to open {path}"))?)
    };
    Ok(match args.chunk {
        Some(chunk) => XmlInputSource::from_reader(
            Some(path),
            ChunkedReader {
                inner: reader,
                chunk: chunk.max(1),
            },
        ),
        None => XmlInputSource::from_reader(Some(path), reader),
    })
}

/// Scan one file. Returns `true` if it is well-formed.
fn scan_file(args: &CmdArgs, config: &XmlScanConfig, path: &str) -> Result<bool> {
    let mut scanner = if args.fragment {
        XmlDocumentScanner::new_fragment(config.clone())
    } else {
        XmlDocumentScanner::new(config.clone())
    };
    if !args.quiet {
        scanner.set_document_handler(Some(Box::new(EventPrinter { out: stdout() })));
    }

    let source = open_input(args, path)?;
    let res = scanner.open(source).and_then(|opened| {
        if !opened {
            return Ok(false);
        }
        if args.step {
            while scanner.dispatch(false)? {}
            Ok(false)
        } else {
            scanner.scan_document(true)
        }
    });
    scanner.close();
    match res {
        Ok(_) | Err(XmlScanError::Fatal(_)) => {}
        Err(err) => return Err(err).with_context(|| format!("failed to scan {path}")),
    }
    Ok(scanner.entity_manager().error_reporter().well_formed())
}

fn main() -> Result<ExitCode> {
    let args = CmdArgs::parse();
    set_debug_entities(args.debug_entities);
    let config = args.config()?;

    let mut failed = false;
    for path in &args.xml_files {
        match scan_file(&args, &config, path) {
            Ok(true) => {}
            Ok(false) => {
                failed = true;
                if !args.quiet {
                    eprintln!("{path}: not well-formed (xscan {})", get_scanner_version());
                }
            }
            Err(err) => {
                failed = true;
                eprintln!("{err:#}");
            }
        }
    }
    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
