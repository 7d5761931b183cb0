mod nested;
mod singletons;
