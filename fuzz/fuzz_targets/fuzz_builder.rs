//! Differential fuzzing of the pooled string builder against `String`.

#![no_main]

use libfuzzer_sys::fuzz_target;
use memscratch::PooledStringBuilder;

fuzz_target!(|data: &[u8]| {
    let mut builder = PooledStringBuilder::new();
    let mut model = String::new();

    let mut rest = data;
    while let Some((&op, tail)) = rest.split_first() {
        rest = tail;
        match op % 4 {
            0 => {
                let take = rest.len().min(300);
                let (head, tail) = rest.split_at(take);
                rest = tail;
                let s = String::from_utf8_lossy(head);
                builder.push_str(&s).unwrap();
                model.push_str(&s);
            }
            1 => {
                let Some((&b, tail)) = rest.split_first() else {
                    break;
                };
                rest = tail;
                let c = char::from(b);
                builder.push(c).unwrap();
                model.push(c);
            }
            2 => {
                let Some((&n, tail)) = rest.split_first() else {
                    break;
                };
                rest = tail;
                let n = usize::from(n) * 4;
                builder.push_repeat('\u{2603}', n).unwrap();
                for _ in 0..n {
                    model.push('\u{2603}');
                }
            }
            _ => {
                builder.clear().unwrap();
                model.clear();
            }
        }
        assert_eq!(builder.len(), model.len());
    }

    assert_eq!(builder.build().unwrap(), model);
});
