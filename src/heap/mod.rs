mod heap_segment;

pub use heap_segment::HeapSegment;
