//! Merged-cell regions from OOXML worksheet parts.
//!
//! calamine reads values and formulas but not merges, so the loader opens the
//! package a second time and picks the `<mergeCell ref="..."/>` elements out
//! of each worksheet XML.

use std::collections::HashMap;
use std::io::{Read, Seek};
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;
use sheetc_engine::cell_id::parse_a1;
use sheetc_engine::sheet::MergedRegion;
use zip::ZipArchive;

/// True for file extensions stored as an OOXML package.
pub fn is_ooxml(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| matches!(e.to_ascii_lowercase().as_str(), "xlsx" | "xlsm"))
        .unwrap_or(false)
}

/// Merged regions for each of `sheet_names`, in the same order.
/// A sheet whose part cannot be located gets an empty list.
pub fn read_merged_regions(path: &Path, sheet_names: &[String]) -> Result<Vec<Vec<MergedRegion>>, String> {
    let file = std::fs::File::open(path).map_err(|e| format!("Failed to open '{}': {}", path.display(), e))?;
    let mut archive =
        ZipArchive::new(file).map_err(|e| format!("Failed to read '{}' as ZIP: {}", path.display(), e))?;

    let workbook_xml = read_zip_file(&mut archive, "xl/workbook.xml")?;
    let rels_xml = read_zip_file(&mut archive, "xl/_rels/workbook.xml.rels")?;
    let paths = worksheet_paths(&workbook_xml, &rels_xml, sheet_names);

    let mut regions = Vec::with_capacity(sheet_names.len());
    for (name, part) in sheet_names.iter().zip(&paths) {
        match part {
            Some(part) => regions.push(parse_merge_cells(&read_zip_file(&mut archive, part)?)),
            None => {
                log::debug!("no worksheet part for sheet '{}'", name);
                regions.push(Vec::new());
            }
        }
    }
    Ok(regions)
}

/// Extract `<mergeCell ref="A1:C3"/>` regions from one worksheet XML.
pub fn parse_merge_cells(xml: &str) -> Vec<MergedRegion> {
    let mut regions = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) if e.name().as_ref() == b"mergeCell" => {
                for attr in e.attributes().flatten() {
                    if attr.key.as_ref() == b"ref" {
                        let text = String::from_utf8_lossy(&attr.value);
                        match parse_merge_ref(&text) {
                            Some(region) => regions.push(region),
                            None => log::warn!("ignoring malformed merge reference '{}'", text),
                        }
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                log::warn!("worksheet XML error at byte {}: {}", reader.buffer_position(), e);
                break;
            }
            _ => {}
        }
        buf.clear();
    }
    regions
}

/// "A1:C3" -> region from (0, 0) to (2, 2). A lone coordinate is a 1x1 region.
fn parse_merge_ref(r: &str) -> Option<MergedRegion> {
    let (first, last) = r.split_once(':').unwrap_or((r, r));
    let start = parse_a1(first)?;
    let end = parse_a1(last)?;
    Some(MergedRegion::new(start, end))
}

fn read_zip_file<R: Read + Seek>(archive: &mut ZipArchive<R>, path: &str) -> Result<String, String> {
    let mut file = archive
        .by_name(path)
        .map_err(|e| format!("File '{}' not found in workbook package: {}", path, e))?;
    let mut content = String::new();
    file.read_to_string(&mut content)
        .map_err(|e| format!("Failed to read '{}': {}", path, e))?;
    Ok(content)
}

/// Resolve each sheet name to its worksheet part through workbook.xml
/// (name -> r:id) and the workbook relationships (r:id -> target).
fn worksheet_paths(workbook_xml: &str, rels_xml: &str, sheet_names: &[String]) -> Vec<Option<String>> {
    let name_to_rid = collect_pairs(workbook_xml, b"sheet", b"name", b"r:id");
    let rid_to_target: HashMap<String, String> = collect_pairs(rels_xml, b"Relationship", b"Id", b"Target")
        .into_iter()
        .collect();

    sheet_names
        .iter()
        .map(|name| {
            let rid = name_to_rid.iter().find(|(n, _)| n == name).map(|(_, r)| r)?;
            rid_to_target.get(rid).map(|target| part_path(target))
        })
        .collect()
}

/// Targets are relative to `xl/` unless they start with `/`.
fn part_path(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{}", target),
    }
}

/// (key, value) attribute pairs of every `element` that carries both.
fn collect_pairs(xml: &str, element: &[u8], key: &[u8], value: &[u8]) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) if e.name().as_ref() == element => {
                let mut k = None;
                let mut v = None;
                for attr in e.attributes().flatten() {
                    let text = match attr.decode_and_unescape_value(reader.decoder()) {
                        Ok(v) => v.into_owned(),
                        Err(_) => String::from_utf8_lossy(&attr.value).into_owned(),
                    };
                    if attr.key.as_ref() == key {
                        k = Some(text);
                    } else if attr.key.as_ref() == value {
                        v = Some(text);
                    }
                }
                if let (Some(k), Some(v)) = (k, v) {
                    pairs.push((k, v));
                }
            }
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
        buf.clear();
    }
    pairs
}
