mod criteria;
mod graph;
