#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use loglens::index::{ChunkReader, LineAccessor, LineIndexBuilder};
use loglens::utils::{AbortFlag, NoProgress};

#[derive(Arbitrary, Debug)]
struct Input {
    chunk_size: u8,
    data: Vec<u8>,
}

fuzz_target!(|input: Input| {
    // Chunk boundaries must never change where lines start, including a
    // CR at the end of one chunk followed by LF at the start of the next
    let reader = ChunkReader::from_bytes(input.data.clone());
    let small = LineIndexBuilder::new(input.chunk_size as usize + 1)
        .build(&reader, &mut NoProgress, &AbortFlag::new())
        .unwrap();
    let whole = LineIndexBuilder::new(input.data.len() + 1)
        .build(&reader, &mut NoProgress, &AbortFlag::new())
        .unwrap();
    assert_eq!(small, whole);

    // Raw lines partition the file
    let accessor = LineAccessor::new(&reader, &small);
    let mut rebuilt = Vec::with_capacity(input.data.len());
    for line in 0..accessor.total_lines() {
        rebuilt.extend(accessor.read_raw(line).unwrap().unwrap());
    }
    assert_eq!(rebuilt, input.data);
});
