mod crawl_tests;
mod support;
