//! Builds minimal xlsx packages for import tests. Cells are JSON scalars:
//! strings become inline strings, numbers and booleans are typed, null is skipped.

use serde_json::Value;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use zip::write::FileOptions;
use zip::ZipWriter;

const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const PKG_REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

pub fn write_xlsx(path: &Path, sheets: &[(&str, Vec<Vec<Value>>)]) {
    let file = File::create(path).expect("create xlsx");
    let mut zip = ZipWriter::new(file);
    let opts = FileOptions::default();

    let mut overrides = String::from(
        r#"<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#,
    );
    for i in 1..=sheets.len() {
        overrides.push_str(&format!(
            r#"<Override PartName="/xl/worksheets/sheet{i}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#
        ));
    }
    put(
        &mut zip,
        opts,
        "[Content_Types].xml",
        &format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/>{overrides}</Types>"#
        ),
    );
    put(
        &mut zip,
        opts,
        "_rels/.rels",
        &format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="{PKG_REL_NS}"><Relationship Id="rId1" Type="{REL_NS}/officeDocument" Target="xl/workbook.xml"/></Relationships>"#
        ),
    );

    let mut sheet_entries = String::new();
    let mut rels = String::new();
    for (i, (name, _)) in sheets.iter().enumerate() {
        let n = i + 1;
        sheet_entries.push_str(&format!(
            r#"<sheet name="{name}" sheetId="{n}" r:id="rId{n}"/>"#
        ));
        rels.push_str(&format!(
            r#"<Relationship Id="rId{n}" Type="{REL_NS}/worksheet" Target="worksheets/sheet{n}.xml"/>"#
        ));
    }
    put(
        &mut zip,
        opts,
        "xl/workbook.xml",
        &format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><workbook xmlns="{MAIN_NS}" xmlns:r="{REL_NS}"><sheets>{sheet_entries}</sheets></workbook>"#
        ),
    );
    put(
        &mut zip,
        opts,
        "xl/_rels/workbook.xml.rels",
        &format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="{PKG_REL_NS}">{rels}</Relationships>"#
        ),
    );

    for (i, (_, rows)) in sheets.iter().enumerate() {
        put(
            &mut zip,
            opts,
            &format!("xl/worksheets/sheet{}.xml", i + 1),
            &sheet_xml(rows),
        );
    }

    zip.finish().expect("finish xlsx");
}

fn put(zip: &mut ZipWriter<File>, opts: FileOptions, name: &str, body: &str) {
    zip.start_file(name, opts).expect("start xlsx part");
    zip.write_all(body.as_bytes()).expect("write xlsx part");
}

fn sheet_xml(rows: &[Vec<Value>]) -> String {
    let mut data = String::new();
    for (r, row) in rows.iter().enumerate() {
        let rn = r + 1;
        data.push_str(&format!(r#"<row r="{rn}">"#));
        for (c, cell) in row.iter().enumerate() {
            let cref = format!("{}{}", column_name(c), rn);
            match cell {
                Value::Null => {}
                Value::Bool(b) => data.push_str(&format!(
                    r#"<c r="{cref}" t="b"><v>{}</v></c>"#,
                    if *b { 1 } else { 0 }
                )),
                Value::Number(n) => data.push_str(&format!(r#"<c r="{cref}"><v>{n}</v></c>"#)),
                other => {
                    let text = other.as_str().map(str::to_string).unwrap_or_else(|| other.to_string());
                    data.push_str(&format!(
                        r#"<c r="{cref}" t="inlineStr"><is><t>{}</t></is></c>"#,
                        escape(&text)
                    ));
                }
            }
        }
        data.push_str("</row>");
    }
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><worksheet xmlns="{MAIN_NS}"><sheetData>{data}</sheetData></worksheet>"#
    )
}

fn column_name(mut idx: usize) -> String {
    let mut out = Vec::new();
    loop {
        out.push(b'A' + (idx % 26) as u8);
        if idx < 26 {
            break;
        }
        idx = idx / 26 - 1;
    }
    out.reverse();
    String::from_utf8(out).expect("ascii column name")
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
