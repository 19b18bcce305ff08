mod code_buffer;
mod frame;
