use std::cmp::Ordering;
use std::mem;
use byteorder::{ByteOrder, LittleEndian};

/// Attribute type a scan predicate compares on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Datatype {
    Integer,
    Float,
    String,
}

/// Comparison operator of a scan predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompOp {
    Lt,
    Lte,
    Eq,
    Gte,
    Gt,
    Ne,
}

/// Filter applied to each record during a scan: compares `length` bytes at
/// `offset` inside the record against `value`.
#[derive(Debug, Clone)]
pub struct Predicate {
    pub offset: usize,
    pub length: usize,
    pub datatype: Datatype,
    pub value: Vec<u8>,
    pub op: CompOp,
}

impl Predicate {
    /// Parameter validation performed by `start_scan`.
    pub(crate) fn is_valid(&self) -> bool {
        if self.length < 1 {
            return false;
        }
        match self.datatype {
            Datatype::Integer => {
                if self.length != mem::size_of::<i32>() {
                    return false;
                }
            }
            Datatype::Float => {
                if self.length != mem::size_of::<f32>() {
                    return false;
                }
            }
            Datatype::String => {}
        }
        self.value.len() == self.length
    }

    /// Whether the record satisfies the predicate. An attribute that falls
    /// outside the record is a non-match, not an error. Decoding copies
    /// bytes out of the record buffer, which carries no alignment guarantee.
    pub(crate) fn matches(&self, rec: &[u8]) -> bool {
        if self.offset + self.length > rec.len() {
            return false;
        }

        let attr = &rec[self.offset..self.offset + self.length];

        let diff: f64 = match self.datatype {
            Datatype::Integer => {
                let attr_val = LittleEndian::read_i32(attr) as i64;
                let filter_val = LittleEndian::read_i32(&self.value) as i64;
                (attr_val - filter_val) as f64
            }
            Datatype::Float => {
                let attr_val = LittleEndian::read_f32(attr);
                let filter_val = LittleEndian::read_f32(&self.value);
                (attr_val - filter_val) as f64
            }
            Datatype::String => match attr.cmp(&self.value[..]) {
                Ordering::Less => -1.0,
                Ordering::Equal => 0.0,
                Ordering::Greater => 1.0,
            },
        };

        match self.op {
            CompOp::Lt => diff < 0.0,
            CompOp::Lte => diff <= 0.0,
            CompOp::Eq => diff == 0.0,
            CompOp::Gte => diff >= 0.0,
            CompOp::Gt => diff > 0.0,
            CompOp::Ne => diff != 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_pred(op: CompOp, value: i32) -> Predicate {
        Predicate {
            offset: 0,
            length: 4,
            datatype: Datatype::Integer,
            value: value.to_le_bytes().to_vec(),
            op,
        }
    }

    #[test]
    fn integer_comparisons() {
        let rec = 10i32.to_le_bytes();

        assert!(int_pred(CompOp::Eq, 10).matches(&rec));
        assert!(!int_pred(CompOp::Eq, 11).matches(&rec));
        assert!(int_pred(CompOp::Lt, 11).matches(&rec));
        assert!(int_pred(CompOp::Lte, 10).matches(&rec));
        assert!(int_pred(CompOp::Gt, 9).matches(&rec));
        assert!(int_pred(CompOp::Gte, 10).matches(&rec));
        assert!(int_pred(CompOp::Ne, 9).matches(&rec));
        assert!(!int_pred(CompOp::Ne, 10).matches(&rec));
    }

    #[test]
    fn integer_negative_values() {
        let rec = (-5i32).to_le_bytes();

        assert!(int_pred(CompOp::Lt, 0).matches(&rec));
        assert!(int_pred(CompOp::Eq, -5).matches(&rec));
        assert!(!int_pred(CompOp::Gt, -5).matches(&rec));
    }

    #[test]
    fn float_comparisons() {
        let rec = 2.5f32.to_le_bytes();
        let pred = Predicate {
            offset: 0,
            length: 4,
            datatype: Datatype::Float,
            value: 2.0f32.to_le_bytes().to_vec(),
            op: CompOp::Gt,
        };

        assert!(pred.matches(&rec));
    }

    #[test]
    fn string_comparison_is_bytewise() {
        let rec = b"banana".to_vec();
        let pred = Predicate {
            offset: 0,
            length: 6,
            datatype: Datatype::String,
            value: b"apple!".to_vec(),
            op: CompOp::Gt,
        };

        assert!(pred.matches(&rec));
    }

    #[test]
    fn attribute_at_nonzero_offset() {
        let mut rec = vec![0xFFu8; 8];
        rec[4..8].copy_from_slice(&42i32.to_le_bytes());

        let pred = Predicate {
            offset: 4,
            length: 4,
            datatype: Datatype::Integer,
            value: 42i32.to_le_bytes().to_vec(),
            op: CompOp::Eq,
        };

        assert!(pred.matches(&rec));
    }

    #[test]
    fn out_of_bounds_attribute_never_matches() {
        let rec = [0u8; 3];
        // attribute would extend past the record, even with Ne
        assert!(!int_pred(CompOp::Ne, 1).matches(&rec));
    }

    #[test]
    fn validation_rejects_bad_lengths() {
        let mut pred = int_pred(CompOp::Eq, 1);
        assert!(pred.is_valid());

        pred.length = 8;
        assert!(!pred.is_valid());

        let zero_len = Predicate {
            offset: 0,
            length: 0,
            datatype: Datatype::String,
            value: vec![],
            op: CompOp::Eq,
        };
        assert!(!zero_len.is_valid());

        let mismatched = Predicate {
            offset: 0,
            length: 3,
            datatype: Datatype::String,
            value: b"ab".to_vec(),
            op: CompOp::Eq,
        };
        assert!(!mismatched.is_valid());
    }
}
