mod controls;
mod details;
mod fps;
mod legend;
mod panels;
mod view;
