mod pipeline;
mod sweep;
