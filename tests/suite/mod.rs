mod concurrency;
mod end_to_end;
mod metrics;
mod modes;
