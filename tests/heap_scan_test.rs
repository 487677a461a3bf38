use anyhow::Result;

use heapstore::{create_heap_file, CompOp, Datatype, HeapError, HeapFileScan, InsertFileScan, Predicate};

mod common;
use common::{create_test_buffer_pool, record_with_key};

fn int_filter(op: CompOp, value: i32) -> Option<Predicate> {
    Some(Predicate {
        offset: 0,
        length: 4,
        datatype: Datatype::Integer,
        value: value.to_le_bytes().to_vec(),
        op,
    })
}

#[test]
fn test_scan_empty_file() -> Result<()> {
    let (buffer_pool, dir) = create_test_buffer_pool(20)?;
    let path = dir.path().join("empty");
    create_heap_file(&buffer_pool, &path)?;

    let mut scan = HeapFileScan::open(buffer_pool.clone(), &path)?;
    scan.start_scan(None)?;

    assert_eq!(scan.scan_next()?, None);
    // End of file is sticky
    assert_eq!(scan.scan_next()?, None);

    Ok(())
}

#[test]
fn test_full_scan_returns_insertion_order() -> Result<()> {
    let (buffer_pool, dir) = create_test_buffer_pool(50)?;
    let path = dir.path().join("ordered");
    create_heap_file(&buffer_pool, &path)?;

    // 200 records of 100 bytes span three data pages
    let mut inserted = Vec::new();
    {
        let mut writer = InsertFileScan::open(buffer_pool.clone(), &path)?;
        for key in 0..200i32 {
            inserted.push(writer.insert_record(&record_with_key(key, 100))?);
        }
    }

    let mut scan = HeapFileScan::open(buffer_pool.clone(), &path)?;
    scan.start_scan(None)?;

    let mut seen = Vec::new();
    while let Some(rid) = scan.scan_next()? {
        seen.push(rid);
    }

    assert_eq!(seen, inserted);

    Ok(())
}

#[test]
fn test_scan_record_bytes_match() -> Result<()> {
    let (buffer_pool, dir) = create_test_buffer_pool(20)?;
    let path = dir.path().join("bytes");
    create_heap_file(&buffer_pool, &path)?;

    {
        let mut writer = InsertFileScan::open(buffer_pool.clone(), &path)?;
        for key in 0..20i32 {
            writer.insert_record(&record_with_key(key, 48))?;
        }
    }

    let mut scan = HeapFileScan::open(buffer_pool.clone(), &path)?;
    scan.start_scan(None)?;

    let mut key = 0i32;
    while scan.scan_next()?.is_some() {
        assert_eq!(scan.get_record()?, record_with_key(key, 48));
        key += 1;
    }
    assert_eq!(key, 20);

    Ok(())
}

#[test]
fn test_filtered_scan_integer_gt() -> Result<()> {
    let (buffer_pool, dir) = create_test_buffer_pool(20)?;
    let path = dir.path().join("gt");
    create_heap_file(&buffer_pool, &path)?;

    let mut expected = Vec::new();
    {
        let mut writer = InsertFileScan::open(buffer_pool.clone(), &path)?;
        for key in 1..=100i32 {
            let rid = writer.insert_record(&record_with_key(key, 40))?;
            if key > 42 {
                expected.push(rid);
            }
        }
    }

    let mut scan = HeapFileScan::open(buffer_pool.clone(), &path)?;
    scan.start_scan(int_filter(CompOp::Gt, 42))?;

    let mut matched = Vec::new();
    while let Some(rid) = scan.scan_next()? {
        matched.push(rid);
    }

    assert_eq!(matched.len(), 58);
    assert_eq!(matched, expected);

    Ok(())
}

#[test]
fn test_filtered_scan_integer_eq() -> Result<()> {
    let (buffer_pool, dir) = create_test_buffer_pool(20)?;
    let path = dir.path().join("eq");
    create_heap_file(&buffer_pool, &path)?;

    let mut target = None;
    {
        let mut writer = InsertFileScan::open(buffer_pool.clone(), &path)?;
        for key in 0..50i32 {
            let rid = writer.insert_record(&record_with_key(key, 40))?;
            if key == 7 {
                target = Some(rid);
            }
        }
    }

    let mut scan = HeapFileScan::open(buffer_pool.clone(), &path)?;
    scan.start_scan(int_filter(CompOp::Eq, 7))?;

    assert_eq!(scan.scan_next()?, target);
    assert_eq!(scan.scan_next()?, None);

    Ok(())
}

#[test]
fn test_filtered_scan_string() -> Result<()> {
    let (buffer_pool, dir) = create_test_buffer_pool(20)?;
    let path = dir.path().join("strings");
    create_heap_file(&buffer_pool, &path)?;

    let names: [&[u8; 8]; 4] = [b"aardvark", b"echidna!", b"pangolin", b"wombat!!"];
    let mut rids = Vec::new();
    {
        let mut writer = InsertFileScan::open(buffer_pool.clone(), &path)?;
        for name in names {
            let mut record = vec![0u8; 16];
            record[8..16].copy_from_slice(name);
            rids.push(writer.insert_record(&record)?);
        }
    }

    // Byte-wise comparison over the 8 bytes at offset 8
    let mut scan = HeapFileScan::open(buffer_pool.clone(), &path)?;
    scan.start_scan(Some(Predicate {
        offset: 8,
        length: 8,
        datatype: Datatype::String,
        value: b"echidna!".to_vec(),
        op: CompOp::Lte,
    }))?;

    let mut matched = Vec::new();
    while let Some(rid) = scan.scan_next()? {
        matched.push(rid);
    }

    assert_eq!(matched, rids[..2].to_vec());

    Ok(())
}

#[test]
fn test_filtered_scan_float() -> Result<()> {
    let (buffer_pool, dir) = create_test_buffer_pool(20)?;
    let path = dir.path().join("floats");
    create_heap_file(&buffer_pool, &path)?;

    let values = [0.5f32, 1.25, 2.0, 3.75];
    let mut rids = Vec::new();
    {
        let mut writer = InsertFileScan::open(buffer_pool.clone(), &path)?;
        for value in values {
            let mut record = vec![0u8; 12];
            record[4..8].copy_from_slice(&value.to_le_bytes());
            rids.push(writer.insert_record(&record)?);
        }
    }

    let mut scan = HeapFileScan::open(buffer_pool.clone(), &path)?;
    scan.start_scan(Some(Predicate {
        offset: 4,
        length: 4,
        datatype: Datatype::Float,
        value: 1.25f32.to_le_bytes().to_vec(),
        op: CompOp::Gte,
    }))?;

    let mut matched = Vec::new();
    while let Some(rid) = scan.scan_next()? {
        matched.push(rid);
    }

    assert_eq!(matched, rids[1..].to_vec());

    Ok(())
}

#[test]
fn test_bad_scan_parameters() -> Result<()> {
    let (buffer_pool, dir) = create_test_buffer_pool(20)?;
    let path = dir.path().join("badparm");
    create_heap_file(&buffer_pool, &path)?;

    let mut scan = HeapFileScan::open(buffer_pool.clone(), &path)?;

    // Integer attributes are exactly four bytes
    let err = scan
        .start_scan(Some(Predicate {
            offset: 0,
            length: 8,
            datatype: Datatype::Integer,
            value: vec![0u8; 8],
            op: CompOp::Eq,
        }))
        .unwrap_err();
    assert!(matches!(err, HeapError::BadScanParm));

    // Zero-length attributes are rejected
    let err = scan
        .start_scan(Some(Predicate {
            offset: 0,
            length: 0,
            datatype: Datatype::String,
            value: vec![],
            op: CompOp::Eq,
        }))
        .unwrap_err();
    assert!(matches!(err, HeapError::BadScanParm));

    // The filter value must cover the attribute length
    let err = scan
        .start_scan(Some(Predicate {
            offset: 0,
            length: 4,
            datatype: Datatype::String,
            value: vec![0u8; 2],
            op: CompOp::Ne,
        }))
        .unwrap_err();
    assert!(matches!(err, HeapError::BadScanParm));

    Ok(())
}

#[test]
fn test_out_of_bounds_attribute_matches_nothing() -> Result<()> {
    let (buffer_pool, dir) = create_test_buffer_pool(20)?;
    let path = dir.path().join("oob");
    create_heap_file(&buffer_pool, &path)?;

    {
        let mut writer = InsertFileScan::open(buffer_pool.clone(), &path)?;
        for key in 0..10i32 {
            writer.insert_record(&record_with_key(key, 50))?;
        }
    }

    // The attribute would start past the end of every record
    let mut scan = HeapFileScan::open(buffer_pool.clone(), &path)?;
    scan.start_scan(Some(Predicate {
        offset: 100,
        length: 4,
        datatype: Datatype::Integer,
        value: 0i32.to_le_bytes().to_vec(),
        op: CompOp::Ne,
    }))?;

    assert_eq!(scan.scan_next()?, None);

    Ok(())
}

#[test]
fn test_start_scan_does_not_reset_position() -> Result<()> {
    let (buffer_pool, dir) = create_test_buffer_pool(20)?;
    let path = dir.path().join("restart");
    create_heap_file(&buffer_pool, &path)?;

    let mut rids = Vec::new();
    {
        let mut writer = InsertFileScan::open(buffer_pool.clone(), &path)?;
        for key in 0..10i32 {
            rids.push(writer.insert_record(&record_with_key(key, 40))?);
        }
    }

    let mut scan = HeapFileScan::open(buffer_pool.clone(), &path)?;
    scan.start_scan(None)?;
    assert_eq!(scan.scan_next()?, Some(rids[0]));
    assert_eq!(scan.scan_next()?, Some(rids[1]));

    // Installing a predicate keeps the cursor where it was
    scan.start_scan(int_filter(CompOp::Gte, 0))?;
    assert_eq!(scan.scan_next()?, Some(rids[2]));

    Ok(())
}

#[test]
fn test_mark_and_reset_same_page() -> Result<()> {
    let (buffer_pool, dir) = create_test_buffer_pool(20)?;
    let path = dir.path().join("mark");
    create_heap_file(&buffer_pool, &path)?;

    let mut rids = Vec::new();
    {
        let mut writer = InsertFileScan::open(buffer_pool.clone(), &path)?;
        for key in 0..10i32 {
            rids.push(writer.insert_record(&record_with_key(key, 40))?);
        }
    }

    let mut scan = HeapFileScan::open(buffer_pool.clone(), &path)?;
    scan.start_scan(None)?;

    for _ in 0..3 {
        scan.scan_next()?;
    }

    scan.mark_scan();
    let first_after_mark = scan.scan_next()?;
    scan.scan_next()?;

    scan.reset_scan()?;
    assert_eq!(scan.scan_next()?, first_after_mark);

    Ok(())
}

#[test]
fn test_mark_and_reset_across_pages() -> Result<()> {
    let (buffer_pool, dir) = create_test_buffer_pool(50)?;
    let path = dir.path().join("markfar");
    create_heap_file(&buffer_pool, &path)?;

    // 75 records of 100 bytes per page; 200 records span three pages
    {
        let mut writer = InsertFileScan::open(buffer_pool.clone(), &path)?;
        for key in 0..200i32 {
            writer.insert_record(&record_with_key(key, 100))?;
        }
    }

    let mut scan = HeapFileScan::open(buffer_pool.clone(), &path)?;
    scan.start_scan(None)?;

    for _ in 0..3 {
        scan.scan_next()?;
    }

    scan.mark_scan();
    let first_after_mark = scan.scan_next()?;

    // Walk well into a later page
    let mut last = None;
    for _ in 0..120 {
        last = scan.scan_next()?;
    }
    assert_ne!(
        last.map(|rid| rid.page_no),
        first_after_mark.map(|rid| rid.page_no)
    );

    scan.reset_scan()?;
    assert_eq!(scan.scan_next()?, first_after_mark);

    Ok(())
}

#[test]
fn test_delete_during_scan() -> Result<()> {
    let (buffer_pool, dir) = create_test_buffer_pool(20)?;
    let path = dir.path().join("purge");
    create_heap_file(&buffer_pool, &path)?;

    // Every fifth record carries the key being purged
    let total = 50i32;
    {
        let mut writer = InsertFileScan::open(buffer_pool.clone(), &path)?;
        for i in 0..total {
            let key = if i % 5 == 0 { 7 } else { i + 1000 };
            writer.insert_record(&record_with_key(key, 40))?;
        }
    }

    let mut deleted = 0u32;
    {
        let mut scan = HeapFileScan::open(buffer_pool.clone(), &path)?;
        scan.start_scan(int_filter(CompOp::Eq, 7))?;

        while scan.scan_next()?.is_some() {
            scan.delete_record()?;
            deleted += 1;
        }

        assert_eq!(deleted, 10);
        assert_eq!(scan.rec_cnt(), total as u32 - deleted);
        scan.end_scan()?;
    }

    // A fresh scan with the same predicate finds nothing
    let mut scan = HeapFileScan::open(buffer_pool.clone(), &path)?;
    assert_eq!(scan.rec_cnt(), 40);
    scan.start_scan(int_filter(CompOp::Eq, 7))?;
    assert_eq!(scan.scan_next()?, None);

    // The other records are all still there
    scan.start_scan(None)?;
    scan.reset_scan()?;
    let mut survivors = 0;
    while scan.scan_next()?.is_some() {
        survivors += 1;
    }
    assert_eq!(survivors, 40);

    Ok(())
}

#[test]
fn test_scan_after_end_scan_fails() -> Result<()> {
    let (buffer_pool, dir) = create_test_buffer_pool(20)?;
    let path = dir.path().join("ended");
    create_heap_file(&buffer_pool, &path)?;

    let mut scan = HeapFileScan::open(buffer_pool.clone(), &path)?;
    scan.start_scan(None)?;
    scan.end_scan()?;

    assert!(matches!(
        scan.scan_next(),
        Err(HeapError::NoCurrentPage)
    ));

    Ok(())
}

#[test]
fn test_delete_without_current_record_fails() -> Result<()> {
    let (buffer_pool, dir) = create_test_buffer_pool(20)?;
    let path = dir.path().join("nocur");
    create_heap_file(&buffer_pool, &path)?;

    let mut scan = HeapFileScan::open(buffer_pool.clone(), &path)?;

    assert!(matches!(
        scan.delete_record(),
        Err(HeapError::NoCurrentRecord)
    ));
    assert!(matches!(scan.get_record(), Err(HeapError::NoCurrentRecord)));

    Ok(())
}
