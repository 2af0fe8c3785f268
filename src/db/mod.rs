pub mod posting_queue;
