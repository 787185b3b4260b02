//! End-to-end source-to-bytes scenarios.

use std::fs;
use std::path::{Path, PathBuf};

use rasm::Failure;

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

fn write_source(name: &str, contents: &str) -> PathBuf {
    let mut path = std::env::temp_dir();
    path.push(format!("rasm_e2e_{}_{}", std::process::id(), name));
    fs::write(&path, contents).unwrap();
    path
}

fn assemble_ok(contents: &str, name: &str) -> Vec<u8> {
    let path = write_source(name, contents);
    let result = rasm::assemble_file(&path);
    fs::remove_file(&path).ok();
    match result {
        Ok(bytes) => bytes,
        Err(Failure::Parse(errors)) => panic!("unexpected parse errors: {errors:?}"),
        Err(Failure::Assembly(e)) => panic!("unexpected assembly error: {e}"),
    }
}

#[test]
fn load_store_rts() {
    let bytes = assemble_ok(".ORG $C000\nLDA #$01\nSTA $D020\nRTS\n", "scenario1.asm");
    assert_eq!(bytes, vec![0x00, 0xC0, 0xA9, 0x01, 0x8D, 0x20, 0xD0, 0x60]);
}

#[test]
fn forward_jump_to_label() {
    let bytes = assemble_ok(".ORG $1000\nJMP LOOP\nLOOP: NOP\n", "scenario2.asm");
    assert_eq!(bytes, vec![0x00, 0x10, 0x4C, 0x03, 0x10, 0xEA]);
}

#[test]
fn branch_to_forward_label() {
    let bytes = assemble_ok(".ORG $2000\nBEQ END\nNOP\nEND: RTS\n", "scenario3.asm");
    assert_eq!(bytes, vec![0x00, 0x20, 0xF0, 0x01, 0xEA, 0x60]);
}

#[test]
fn zero_page_alias_defined_before_use() {
    let bytes = assemble_ok("FOO = $0A\n.ORG $C000\nLDA FOO\n", "scenario4.asm");
    assert_eq!(bytes, vec![0x00, 0xC0, 0xA5, 0x0A]);
}

#[test]
fn late_alias_rejected_late_label_accepted() {
    let path = write_source("scenario5a.asm", ".ORG $C000\nLDA BAR\nBAR = $C100\n");
    let result = rasm::assemble_file(&path);
    fs::remove_file(&path).ok();
    assert!(matches!(result, Err(Failure::Assembly(_))));

    let bytes = assemble_ok(".ORG $C000\nLDA BAR\nBAR: RTS\n", "scenario5b.asm");
    assert_eq!(bytes, vec![0x00, 0xC0, 0xAD, 0x03, 0xC0, 0x60]);
}

#[test]
fn text_directive_and_gap_padding() {
    let bytes = assemble_ok(".ORG $1000\n.TEXT \"A\"\n.ORG $1003\nDFB $FF\n", "scenario6.asm");
    assert_eq!(bytes, vec![0x00, 0x10, 0x01, 0x00, 0x00, 0xFF]);
}

#[test]
fn include_directive_defers_included_file_to_end_of_stream() {
    let entry = fixture("include_main.asm");
    let bytes = rasm::assemble_file(&entry).unwrap_or_else(|e| match e {
        Failure::Parse(errors) => panic!("unexpected parse errors: {errors:?}"),
        Failure::Assembly(e) => panic!("unexpected assembly error: {e}"),
    });
    assert_eq!(bytes, vec![0x00, 0xC0, 0xA9, 0x01, 0x8D, 0x00, 0x04, 0x60]);
}

#[test]
fn bin_directive_embeds_raw_file_bytes() {
    let entry = fixture("bin_include.asm");
    let bytes = rasm::assemble_file(&entry).unwrap_or_else(|e| match e {
        Failure::Parse(errors) => panic!("unexpected parse errors: {errors:?}"),
        Failure::Assembly(e) => panic!("unexpected assembly error: {e}"),
    });
    assert_eq!(bytes, vec![0x00, 0xC0, 0x78, 0x79, 0x7A]);
}

#[test]
fn symbol_write_once_violation_is_fatal() {
    let path = write_source("scenario_dup.asm", "FOO = $01\n.ORG $C000\nFOO: NOP\n");
    let result = rasm::assemble_file(&path);
    fs::remove_file(&path).ok();
    assert!(matches!(result, Err(Failure::Assembly(_))));
}

#[test]
fn label_before_org_is_fatal() {
    let path = write_source("scenario_no_org.asm", "START: NOP\n.ORG $1000\n");
    let result = rasm::assemble_file(&path);
    fs::remove_file(&path).ok();
    assert!(matches!(result, Err(Failure::Assembly(_))));
}

#[test]
fn immediate_operand_boundary() {
    assert!(!assemble_ok(".ORG $C000\nLDA #$FF\n", "scenario_imm_ok.asm").is_empty());

    let path = write_source("scenario_imm_bad.asm", ".ORG $C000\nLDA #$100\n");
    let result = rasm::assemble_file(&path);
    fs::remove_file(&path).ok();
    assert!(result.is_err());
}

#[test]
fn unknown_opcode_is_a_parse_error_not_a_panic() {
    let path = write_source("scenario_unknown.asm", ".ORG $C000\nFROB #$01\n");
    let result = rasm::assemble_file(&path);
    fs::remove_file(&path).ok();
    assert!(matches!(result, Err(Failure::Parse(_))));
}
