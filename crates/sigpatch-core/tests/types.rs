//! Tests for platform-agnostic types

use sigpatch_core::types::{Address, MemoryRegion, ProcessId, ProcessRecord, Signature};

#[test]
fn test_process_id_accepts_positive_values()
{
    let pid = ProcessId::new(12345).unwrap();
    assert_eq!(pid.raw(), 12345);
}

#[test]
fn test_process_id_rejects_zero_and_negative()
{
    assert!(ProcessId::new(0).is_err());
    assert!(ProcessId::new(-1).is_err());
}

#[test]
fn test_process_id_rejects_out_of_range()
{
    assert!(ProcessId::new(i64::from(i32::MAX)).is_ok());
    assert!(ProcessId::new(i64::from(i32::MAX) + 1).is_err());
}

#[test]
fn test_process_id_from_proc_entry()
{
    assert_eq!(ProcessId::from_proc_entry("4242").unwrap().raw(), 4242);
    assert!(ProcessId::from_proc_entry("self").is_none());
    assert!(ProcessId::from_proc_entry("").is_none());
    assert!(ProcessId::from_proc_entry("-5").is_none());
}

#[test]
fn test_process_id_equality()
{
    let pid1 = ProcessId::new(12345).unwrap();
    let pid2 = ProcessId::new(12345).unwrap();
    let pid3 = ProcessId::new(54321).unwrap();

    assert_eq!(pid1, pid2);
    assert_ne!(pid1, pid3);
}

#[test]
fn test_process_record_rejects_over_long_comm()
{
    let pid = ProcessId::new(1).unwrap();
    assert!(ProcessRecord::new(pid, "hl2_linux").is_ok());
    assert!(ProcessRecord::new(pid, &"x".repeat(65)).is_err());
}

#[test]
fn test_address_arithmetic()
{
    let addr = Address::from(0x1000);
    assert_eq!((addr + 0x2f0).value(), 0x12f0);
    assert_eq!((addr - 0x100).value(), 0xf00);
    assert_eq!(addr.checked_add(0x100), Some(Address::from(0x1100)));
    assert_eq!(addr.checked_add(u64::MAX), None);
    assert_eq!(addr.checked_sub(u64::MAX), None);
}

#[test]
fn test_address_displays_as_padded_hex()
{
    let addr = Address::from(0xf71b_3000);
    assert_eq!(format!("{addr}"), "0x00000000f71b3000");
}

#[test]
fn test_memory_region_size()
{
    let region = MemoryRegion::new(Address::from(0x1000), Address::from(0x2000), "r-xp".to_string(), None);
    assert_eq!(region.size(), 0x1000);
}

#[test]
fn test_memory_region_size_zero_on_degenerate_range()
{
    // Edge case: end <= start should return 0 (using saturating_sub)
    let region = MemoryRegion::new(Address::from(0x2000), Address::from(0x1000), "r-xp".to_string(), None);
    assert_eq!(region.size(), 0);
}

#[test]
fn test_memory_region_contains()
{
    let region = MemoryRegion::new(
        Address::from(0x1000),
        Address::from(0x2000),
        "r-xp".to_string(),
        Some("/opt/game/bin/engine.so".to_string()),
    );

    assert!(region.contains(Address::from(0x1000))); // Start (inclusive)
    assert!(region.contains(Address::from(0x1fff))); // Last byte
    assert!(!region.contains(Address::from(0x2000))); // End (exclusive)
    assert!(!region.contains(Address::from(0x500))); // Before start
}

#[test]
fn test_signature_equal_length_invariant()
{
    let sig = Signature::new(vec![0x75, 0x11], vec![0xeb, 0x04]).unwrap();
    assert_eq!(sig.pattern().len(), sig.replacement().len());

    assert!(Signature::new(vec![0x75, 0x11], vec![0xeb]).is_err());
    assert!(Signature::new(vec![], vec![]).is_err());
}

#[test]
fn test_signature_hex_parsing()
{
    let spaced = Signature::from_hex("75 11 84 db", "eb 04 84 db").unwrap();
    let packed = Signature::from_hex("751184db", "eb0484db").unwrap();
    assert_eq!(spaced, packed);

    assert!(Signature::from_hex("75 1", "eb 0").is_err());
    assert!(Signature::from_hex("gg", "hh").is_err());
}
