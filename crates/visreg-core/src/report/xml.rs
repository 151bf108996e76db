//! JUnit-style XML reading and writing.

use std::collections::HashMap;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use super::{
    CaseStatus, Counters, Finding, Report, TestCaseEntry, TestSuite, LEDGER_PROPERTY,
};

const INDENT: usize = 2;

// ============================================================================
// Writing
// ============================================================================

pub(super) fn serialize(report: &Report) -> Result<String, String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', INDENT);

    emit(
        &mut writer,
        Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
    )?;

    let mut root = BytesStart::new("testsuites");
    root.push_attribute(("name", report.name.as_str()));
    push_counters(&mut root, &report.counters);
    emit(&mut writer, Event::Start(root))?;

    if let Some(last_run) = report.last_run() {
        emit(&mut writer, Event::Start(BytesStart::new("properties")))?;
        let mut property = BytesStart::new("property");
        property.push_attribute(("name", LEDGER_PROPERTY));
        property.push_attribute(("value", last_run.to_string().as_str()));
        emit(&mut writer, Event::Empty(property))?;
        emit(&mut writer, Event::End(BytesEnd::new("properties")))?;
    }

    for suite in report.suites() {
        write_suite(&mut writer, suite)?;
    }

    emit(&mut writer, Event::End(BytesEnd::new("testsuites")))?;

    let mut bytes = writer.into_inner();
    bytes.push(b'\n');
    String::from_utf8(bytes).map_err(|e| format!("Report is not valid UTF-8: {}", e))
}

fn write_suite(writer: &mut Writer<Vec<u8>>, suite: &TestSuite) -> Result<(), String> {
    let mut start = BytesStart::new("testsuite");
    start.push_attribute(("name", suite.name.as_str()));
    push_counters(&mut start, &suite.counters);

    if suite.cases.is_empty() {
        return emit(writer, Event::Empty(start));
    }

    emit(writer, Event::Start(start))?;
    for case in &suite.cases {
        write_case(writer, case)?;
    }
    emit(writer, Event::End(BytesEnd::new("testsuite")))
}

fn write_case(writer: &mut Writer<Vec<u8>>, case: &TestCaseEntry) -> Result<(), String> {
    let mut start = BytesStart::new("testcase");
    start.push_attribute(("name", case.name.as_str()));
    start.push_attribute(("classname", case.classname.as_str()));
    start.push_attribute(("run", case.run.to_string().as_str()));
    start.push_attribute(("status", case.status.as_str()));

    let Some(finding) = &case.finding else {
        return emit(writer, Event::Empty(start));
    };

    emit(writer, Event::Start(start))?;

    let element = finding_element(case.status);
    let mut body = BytesStart::new(element);
    body.push_attribute(("message", finding.message.as_str()));
    body.push_attribute(("type", finding.kind.as_str()));
    if finding.details.is_empty() {
        emit(writer, Event::Empty(body))?;
    } else {
        emit(writer, Event::Start(body))?;
        emit(writer, Event::Text(BytesText::new(&finding.details)))?;
        emit(writer, Event::End(BytesEnd::new(element)))?;
    }

    emit(writer, Event::End(BytesEnd::new("testcase")))
}

fn finding_element(status: CaseStatus) -> &'static str {
    match status {
        CaseStatus::Error => "error",
        CaseStatus::Passed | CaseStatus::Failed => "failure",
    }
}

fn push_counters(elem: &mut BytesStart, counters: &Counters) {
    elem.push_attribute(("tests", counters.tests.to_string().as_str()));
    elem.push_attribute(("failures", counters.failures.to_string().as_str()));
    elem.push_attribute(("errors", counters.errors.to_string().as_str()));
    elem.push_attribute(("disabled", counters.disabled.to_string().as_str()));
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), String> {
    writer
        .write_event(event)
        .map_err(|e| format!("Failed to write report XML: {}", e))
}

// ============================================================================
// Reading
// ============================================================================

pub(super) fn parse(contents: &str) -> Result<Report, String> {
    let mut reader = Reader::from_str(contents);
    reader.config_mut().trim_text(true);

    let mut parser = Parser::default();
    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => parser.open(e)?,
            Ok(Event::Empty(ref e)) => {
                parser.open(e)?;
                parser.close(&element_name(e)?)?;
            }
            Ok(Event::End(ref e)) => {
                let name = std::str::from_utf8(e.name().as_ref())
                    .map_err(|err| format!("invalid UTF-8 in element name: {}", err))?
                    .to_string();
                parser.close(&name)?;
            }
            Ok(Event::Text(ref e)) => {
                let text = e
                    .unescape()
                    .map_err(|err| format!("invalid text: {}", err))?;
                parser.text(&text);
            }
            Ok(Event::CData(ref e)) => {
                let text = std::str::from_utf8(e)
                    .map_err(|err| format!("invalid UTF-8 in CDATA: {}", err))?;
                parser.text(text);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(format!(
                    "XML error at position {}: {}",
                    reader.error_position(),
                    e
                ))
            }
            _ => {}
        }
    }

    parser.finish()
}

/// Test case being assembled while its children are read
struct OpenCase {
    entry: TestCaseEntry,
    explicit_status: bool,
}

#[derive(Default)]
struct Parser {
    root: Option<(String, Counters)>,
    last_run: Option<u64>,
    suites: Vec<TestSuite>,
    suite: Option<TestSuite>,
    case: Option<OpenCase>,
    finding: Option<(CaseStatus, Finding)>,
}

impl Parser {
    fn open(&mut self, e: &BytesStart) -> Result<(), String> {
        let name = element_name(e)?;
        match name.as_str() {
            "testsuites" => {
                let attrs = parse_attributes(e)?;
                let report_name = attrs.get("name").cloned().unwrap_or_default();
                self.root = Some((report_name, parse_counters(&attrs)?));
            }
            "property" => {
                let attrs = parse_attributes(e)?;
                if attrs.get("name").map(String::as_str) == Some(LEDGER_PROPERTY) {
                    let value = attrs.get("value").map(String::as_str).unwrap_or_default();
                    let run = value
                        .parse()
                        .map_err(|_| format!("invalid {} value '{}'", LEDGER_PROPERTY, value))?;
                    self.last_run = Some(run);
                }
            }
            "testsuite" => {
                if self.suite.is_some() {
                    return Err("nested testsuite elements".to_string());
                }
                let attrs = parse_attributes(e)?;
                let suite_name = required(&attrs, "testsuite", "name")?;
                self.suite = Some(TestSuite {
                    name: suite_name,
                    counters: parse_counters(&attrs)?,
                    cases: Vec::new(),
                });
            }
            "testcase" => {
                let Some(suite) = &self.suite else {
                    return Err("testcase outside of a testsuite".to_string());
                };
                let attrs = parse_attributes(e)?;
                let run_text = required(&attrs, "testcase", "run")?;
                let run = run_text
                    .parse()
                    .map_err(|_| format!("invalid run '{}' on testcase", run_text))?;
                let status = match attrs.get("status") {
                    Some(value) => Some(
                        CaseStatus::parse(value)
                            .ok_or_else(|| format!("invalid testcase status '{}'", value))?,
                    ),
                    None => None,
                };
                self.case = Some(OpenCase {
                    entry: TestCaseEntry {
                        name: required(&attrs, "testcase", "name")?,
                        classname: attrs
                            .get("classname")
                            .cloned()
                            .unwrap_or_else(|| suite.name.clone()),
                        run,
                        status: status.unwrap_or(CaseStatus::Passed),
                        finding: None,
                    },
                    explicit_status: status.is_some(),
                });
            }
            "failure" | "error" => {
                if self.case.is_none() {
                    return Err(format!("{} outside of a testcase", name));
                }
                let attrs = parse_attributes(e)?;
                let status = if name == "error" {
                    CaseStatus::Error
                } else {
                    CaseStatus::Failed
                };
                self.finding = Some((
                    status,
                    Finding {
                        message: attrs.get("message").cloned().unwrap_or_default(),
                        kind: attrs.get("type").cloned().unwrap_or_default(),
                        details: String::new(),
                    },
                ));
            }
            _ => {}
        }
        Ok(())
    }

    fn close(&mut self, name: &str) -> Result<(), String> {
        match name {
            "failure" | "error" => {
                if let (Some((status, finding)), Some(case)) = (self.finding.take(), &mut self.case)
                {
                    if !case.explicit_status {
                        case.entry.status = status;
                    }
                    case.entry.finding = Some(finding);
                }
            }
            "testcase" => {
                if let (Some(case), Some(suite)) = (self.case.take(), &mut self.suite) {
                    suite.cases.push(case.entry);
                }
            }
            "testsuite" => {
                if let Some(suite) = self.suite.take() {
                    self.suites.push(suite);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn text(&mut self, text: &str) {
        if let Some((_, finding)) = &mut self.finding {
            finding.details.push_str(text);
        }
    }

    fn finish(self) -> Result<Report, String> {
        let Some((name, counters)) = self.root else {
            return Err("missing testsuites root element".to_string());
        };
        if self.suite.is_some() || self.case.is_some() {
            return Err("unterminated testsuite".to_string());
        }
        Report::from_parts(name, counters, self.last_run, self.suites)
    }
}

fn element_name(e: &BytesStart) -> Result<String, String> {
    std::str::from_utf8(e.name().as_ref())
        .map_err(|err| format!("invalid UTF-8 in element name: {}", err))
        .map(|s| s.to_string())
}

fn parse_attributes(elem: &BytesStart) -> Result<HashMap<String, String>, String> {
    let mut attrs = HashMap::new();
    for attr_result in elem.attributes() {
        let attr = attr_result.map_err(|e| format!("attribute error: {}", e))?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|e| format!("invalid UTF-8 in attribute key: {}", e))?
            .to_string();
        let value = attr
            .unescape_value()
            .map_err(|e| format!("invalid attribute value for '{}': {}", key, e))?
            .into_owned();
        attrs.insert(key, value);
    }
    Ok(attrs)
}

fn required(attrs: &HashMap<String, String>, element: &str, key: &str) -> Result<String, String> {
    attrs
        .get(key)
        .cloned()
        .ok_or_else(|| format!("{} is missing the '{}' attribute", element, key))
}

fn parse_counters(attrs: &HashMap<String, String>) -> Result<Counters, String> {
    let counter = |key: &str| -> Result<u64, String> {
        match attrs.get(key) {
            Some(value) => value
                .parse()
                .map_err(|_| format!("invalid {} counter '{}'", key, value)),
            None => Ok(0),
        }
    };
    Ok(Counters {
        tests: counter("tests")?,
        failures: counter("failures")?,
        errors: counter("errors")?,
        disabled: counter("disabled")?,
    })
}
