// Root of the gateway module: conversion engine, fetcher and service layer
pub mod backend;
pub mod config;
pub mod entities;
pub mod errors;
pub mod html_converter;
pub mod http_client;
pub mod logging;
pub mod parser;
pub mod rules;
pub mod service;
pub mod title;
